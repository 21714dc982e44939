use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Doctor => "doctor",
    Patient => "patient",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(BloodGroup {
    APositive => "a_positive",
    ANegative => "a_negative",
    BPositive => "b_positive",
    BNegative => "b_negative",
    AbPositive => "ab_positive",
    AbNegative => "ab_negative",
    OPositive => "o_positive",
    ONegative => "o_negative",
});

str_enum!(Specialization {
    GeneralMedicine => "general_medicine",
    Cardiology => "cardiology",
    Dermatology => "dermatology",
    Endocrinology => "endocrinology",
    Gastroenterology => "gastroenterology",
    Neurology => "neurology",
    ObstetricsGynecology => "obstetrics_gynecology",
    Ophthalmology => "ophthalmology",
    Orthopedics => "orthopedics",
    Pediatrics => "pediatrics",
    Psychiatry => "psychiatry",
    Pulmonology => "pulmonology",
    Radiology => "radiology",
    Urology => "urology",
});

str_enum!(Weekday {
    Monday => "monday",
    Tuesday => "tuesday",
    Wednesday => "wednesday",
    Thursday => "thursday",
    Friday => "friday",
    Saturday => "saturday",
    Sunday => "sunday",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    CancelledByPatient => "cancelled_by_patient",
    CancelledByDoctor => "cancelled_by_doctor",
});

impl AppointmentStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}
