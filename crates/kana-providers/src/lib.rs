//! External collaborators: the Gemini model gateway, VOICEVOX speech
//! synthesis, and the SwitchBot device cloud.

pub mod gemini;
pub mod switchbot;
pub mod voicevox;

pub use gemini::GeminiClient;
pub use switchbot::SwitchBotClient;
pub use voicevox::VoicevoxClient;
