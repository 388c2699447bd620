mod medium;
mod recipe_store;
mod record;
#[cfg(test)]
mod tests;

pub use medium::{JsonFileMedium, MemoryMedium, RecordMedium};
pub use recipe_store::RecipeStore;
pub use record::RecipeRecord;
