//! Error types

use serde::Serialize;
use thiserror::Error;

/// A form field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The offending field, named as in the form.
    pub field: String,
    /// Message shown next to the field.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error raised by one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message attached to `field`, if any
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was pushed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} não encontrado")]
    NotFound { entity: &'static str, id: u64 },

    #[error("Este número de fatura já existe.")]
    DuplicateInvoiceNumber(String),

    #[error("O email {0} já está registado")]
    DuplicateEmail(String),

    #[error("{entity} {id} não existe")]
    UnknownReference { entity: &'static str, id: u64 },

    #[error("conversa {0} não encontrada")]
    ConversationNotFound(u64),

    #[error("utilizador {user_id} não participa na conversa {conversation_id}")]
    NotParticipant { conversation_id: u64, user_id: u64 },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email ou senha inválidos")]
    InvalidCredentials,

    #[error("Utilizador inativo")]
    InactiveUser,

    #[error("A senha deve ter no mínimo 6 caracteres")]
    PasswordTooShort,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("session storage error: {0}")]
    SessionIo(#[from] std::io::Error),

    #[error("session data is corrupt: {0}")]
    SessionData(#[from] serde_json::Error),
}
