//! Directory access: search results and individual record pages.

mod record;
mod search;

pub use record::{
    CANONICAL_FIELDS, FIELD_COUNT, FIELD_TABLE, FieldRule, FieldSource, Normalize, Record,
    RecordExtractor, extract_record,
};
pub use search::{
    DEFAULT_PAGE_SIZE, DirectorySearchClient, RecordId, SearchFilter, extract_record_ids,
};
