pub mod locale;
pub mod models;
pub mod render;
pub mod validation;

pub use locale::{command_locale, is_command, resolve_locale, LANGUAGE_COMMANDS};
pub use models::*;
pub use render::{field_label, format_price, render, Message, MessageKind};
pub use validation::{GateCheck, ValidationFailure, ValidationGate, ValidationLimits};
