pub mod domain;
pub mod feed;
pub mod ports;
pub mod reports;
pub mod validation;

pub use domain::{
    AuthSession, NewReport, PhotoUpload, ProfileUpdate, Report, ReportId, ReportStatus,
    ReportUpdate, UserCredentials, UserId, UserProfile,
};
pub use feed::{FeedFilters, FeedQuery, FeedSession};
pub use ports::{
    AccountStore, ChangeStream, MediaHost, PortError, PortResult, ReportStore, StoreChange,
};
pub use reports::{PhotoChanges, ReportError, ReportService};
pub use validation::{ReportDraft, ValidationError, MAX_PHOTOS};
