//! Bookable services offered by the platform.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A bookable service. Each service owns one provider calendar, so two
/// commitments on the same service contend for the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// One-on-one financial advisory session.
    ConsultorioFinanciero,
    /// Personal trading training session.
    EntrenamientoPersonal,
    /// Time-boxed subscription to the live trading room.
    SalaEnVivo,
}

impl ServiceKind {
    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::ConsultorioFinanciero => "Consultorio Financiero",
            ServiceKind::EntrenamientoPersonal => "Entrenamiento Personal",
            ServiceKind::SalaEnVivo => "Sala en Vivo",
        }
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultorio_financiero" | "consultorio" => Ok(ServiceKind::ConsultorioFinanciero),
            "entrenamiento_personal" | "entrenamiento" => Ok(ServiceKind::EntrenamientoPersonal),
            "sala_en_vivo" | "sala" => Ok(ServiceKind::SalaEnVivo),
            other => Err(format!("unknown service: {other}")),
        }
    }
}

/// The kind of appointment a booking represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    /// An advisory appointment.
    #[default]
    Advisory,
    /// A training appointment.
    Training,
}
