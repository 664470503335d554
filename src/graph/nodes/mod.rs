mod followup;
mod generate;
mod retrieve;

pub use followup::FollowUpNode;
pub use generate::GenerateNode;
pub use retrieve::RetrieveNode;
