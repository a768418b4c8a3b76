pub mod offset_cache;
