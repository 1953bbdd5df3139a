use crate::models::Locale;

/// Commands that select a conversation language. `start` is what Telegram
/// clients send on first contact, so it maps to the base language.
pub const LANGUAGE_COMMANDS: [(&str, Locale); 5] = [
    ("inicio", Locale::Es),
    ("start", Locale::Es),
    ("english", Locale::En),
    ("french", Locale::Fr),
    ("portuguese", Locale::Pt),
];

pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Reduces `/English@SkyPriceBot extra words` to `english`.
pub fn command_token(text: &str) -> String {
    let first = text.split_whitespace().next().unwrap_or_default();
    let bare = first.trim_start_matches('/');
    let bare = bare.split('@').next().unwrap_or_default();
    bare.to_lowercase()
}

pub fn command_locale(token: &str) -> Option<Locale> {
    let token = command_token(token);
    LANGUAGE_COMMANDS
        .iter()
        .find(|(command, _)| *command == token)
        .map(|(_, locale)| *locale)
}

/// A recognized command wins; otherwise the stored language, otherwise the default.
pub fn resolve_locale(command: Option<&str>, stored: Option<Locale>) -> Locale {
    command
        .and_then(command_locale)
        .or(stored)
        .unwrap_or_default()
}
