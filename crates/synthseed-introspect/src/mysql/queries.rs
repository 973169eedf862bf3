/// Key columns of one table in the current database. MySQL backs every
/// unique index with a `UNIQUE` constraint entry, so `KEY_COLUMN_USAGE` is
/// sufficient.
///
/// `?` is the table name.
pub const TABLE_CONSTRAINTS: &str = r#"
SELECT
  CASE tc.CONSTRAINT_TYPE
    WHEN 'PRIMARY KEY' THEN 'p'
    WHEN 'UNIQUE' THEN 'u'
    ELSE 'f'
  END AS kind,
  CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
  CAST(k.COLUMN_NAME AS CHAR) AS column_name,
  CAST(k.ORDINAL_POSITION AS CHAR) AS position,
  CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
  CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column
FROM information_schema.KEY_COLUMN_USAGE k
JOIN information_schema.TABLE_CONSTRAINTS tc
  ON tc.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
  AND tc.TABLE_NAME = k.TABLE_NAME
  AND tc.CONSTRAINT_NAME = k.CONSTRAINT_NAME
WHERE k.TABLE_SCHEMA = DATABASE()
  AND k.TABLE_NAME = ?
  AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
ORDER BY kind, constraint_name, k.ORDINAL_POSITION
"#;
