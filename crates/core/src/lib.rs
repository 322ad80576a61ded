pub mod member;
pub mod money;
pub mod transaction;

pub use member::{Member, MemberDirectory, MemberId, MemberIdError};
pub use money::Money;
pub use transaction::{TransactionRecord, UNCATEGORIZED};
