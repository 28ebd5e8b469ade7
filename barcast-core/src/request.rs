//! Evaluation request model.

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::domain::InstrumentId;

fn default_bajista() -> bool {
    false
}

fn default_periodo() -> i32 {
    6
}

fn default_idmercado() -> i32 {
    8
}

/// Top-level evaluation request, shared by the batch and streaming paths.
///
/// `start` and `end` are display dates (`YYYY-MM-DD`). They bound which bars
/// are emitted, never which bars feed indicator computation: indicators always
/// see the full loaded history. Only the entry conditions drive decisions;
/// exit conditions, `stop_loss`, `bajista`, `periodo` and `idmercado` ride
/// along and participate in the request fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRequest {
    pub idnectums: Vec<InstrumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_conditions_entry: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_conditions_exit: Option<Vec<Condition>>,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(
        rename = "stopLoss",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stop_loss: Option<f64>,
    #[serde(default = "default_bajista")]
    pub bajista: bool,
    #[serde(default = "default_periodo")]
    pub periodo: i32,
    #[serde(default = "default_idmercado")]
    pub idmercado: i32,
}

impl EvalRequest {
    /// Request with only the required fields set and wire defaults elsewhere.
    pub fn new(idnectums: Vec<InstrumentId>, start: impl Into<String>) -> Self {
        Self {
            idnectums,
            list_conditions_entry: None,
            list_conditions_exit: None,
            start: start.into(),
            end: None,
            stop_loss: None,
            bajista: default_bajista(),
            periodo: default_periodo(),
            idmercado: default_idmercado(),
        }
    }

    /// Entry conditions in declared order; empty when absent.
    pub fn entry_conditions(&self) -> &[Condition] {
        self.list_conditions_entry.as_deref().unwrap_or(&[])
    }
}
