pub mod analysis;
pub mod coverage;
pub mod document;
pub mod enums;
pub mod lenient;
pub mod stage;
pub mod test_case;
pub mod test_data;
pub mod user_story;

pub use analysis::*;
pub use coverage::*;
pub use document::*;
pub use enums::*;
pub use stage::*;
pub use test_case::*;
pub use test_data::*;
pub use user_story::*;
