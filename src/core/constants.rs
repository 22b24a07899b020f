//! Shared constants used across the application

/// Seed message every new session starts with.
pub const WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// Sessions are never auto-titled; this is the only title they ever carry.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Shown in place of a reply when an exchange fails for any reason.
/// The underlying error goes to the log only.
pub const SEND_FAILURE_MESSAGE: &str = "Sorry, there was an error. Please try again.";

/// Whole-document response with no assistant output item.
pub const NO_ASSISTANT_MESSAGE: &str = "[No assistant message found]";

/// Assistant output item present but without an output_text part.
pub const NO_RESPONSE_TEXT: &str = "[No response text found]";

/// Sidebar preview for sessions that have not been spoken to yet.
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// The sidebar preview shows this many characters of the first user turn.
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Placeholder rendered between sending a message and the first chunk.
pub const THINKING_INDICATOR: &str = "Thinking…";

/// Byte budget for the serialized session registry.
pub const DEFAULT_STORE_CAPACITY_BYTES: usize = 5 * 1024 * 1024;
