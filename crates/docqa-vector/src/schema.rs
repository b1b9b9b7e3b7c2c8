use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Columns returned by get-all scans; everything except the vector.
pub const TEXT_COLUMNS: [&str; 6] = ["id", "filename", "file_type", "content", "chunk_index", "total_chunks"];

pub fn build_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("filename", DataType::Utf8, false),
		Field::new("file_type", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("total_chunks", DataType::Int32, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Dimensionality of the vector column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => Some(*n),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_dim_reads_back_built_schema() {
		assert_eq!(vector_dim(&build_schema(384)), Some(384));
		assert_eq!(vector_dim(&Schema::new(vec![Field::new("id", DataType::Utf8, false)])), None);
	}
}
