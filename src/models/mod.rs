pub mod loaders;
pub mod profile;
pub mod profile_store;
pub mod question;

pub use loaders::{load_question_sheet, save_question_sheet};
pub use profile::{default_profiles, SubmissionMode, TargetProfile};
pub use profile_store::ProfileStore;
pub use question::{QuestionRecord, QuestionSheet, QuestionStatus};
