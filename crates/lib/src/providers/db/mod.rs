pub mod sqlite;
pub mod storage;
pub mod supabase;
