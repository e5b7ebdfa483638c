mod update;

pub use update::{
    FinalResultContent, ToggleText, ToolResultContent, Update, UpdateKind, UpdateType,
    UpdatesContent,
};
