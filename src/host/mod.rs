//! Host-facing collaborator contracts and the reference host bridge.

pub mod conversation;
pub mod stdio;
pub mod traits;

pub use conversation::MemoryConversationStore;
pub use stdio::{BridgeOptions, BridgeOutput, JsonLineSink, run_bridge, run_stdio_bridge};
pub use traits::{
    CompletionProvider, Conversation, ConversationStore, HistoryTurn, MessageChain, MessageSink,
    ProviderRegistry,
};
