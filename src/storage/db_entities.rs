//! SeaORM entity models used by the database storage backend.
//!
//! These structs map to the SQLite tables created by `database_storage`:
//! - `findings`: one row per stored finding, tagged with its capture session

/// Findings table entity models.
pub mod findings {
    use sea_orm::entity::prelude::*;

    /// One finding as stored for review.
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "findings")]
    pub struct Model {
        /// Auto-increment row id
        #[sea_orm(primary_key)]
        pub id: i32,
        /// UUID of the capture session that produced the finding
        pub session_id: String,
        /// Capture time, milliseconds since the Unix epoch
        pub captured_at_epoch_millis: i64,
        /// IANA timezone name or UTC offset of the monitored host
        pub timezone_id: String,
        /// Raw request target bytes
        pub request_path: Option<Vec<u8>>,
        /// Raw Host header bytes
        pub host: Option<Vec<u8>>,
        /// Raw Referer header bytes
        pub referer: Option<Vec<u8>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
