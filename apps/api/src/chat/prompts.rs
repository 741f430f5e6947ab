/// Seed turn sent alongside the contract before any replayed history.
pub const CHAT_CONTEXT_PROMPT: &str = "Use the attached contract as a context to answer my queries";
