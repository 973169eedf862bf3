/// Primary key, unique and foreign key columns of one table, including unique
/// indexes that are not backed by a constraint.
///
/// `$1` is the schema and `$2` the table name.
pub const TABLE_CONSTRAINTS: &str = r#"
SELECT
  c.contype::text AS kind,
  c.conname::text AS constraint_name,
  a.attname::text AS column_name,
  k.ordinality::text AS position,
  rc.relname::text AS referenced_table,
  ra.attname::text AS referenced_column
FROM pg_constraint c
JOIN pg_class t ON t.oid = c.conrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ordinality)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
LEFT JOIN pg_class rc ON rc.oid = c.confrelid
LEFT JOIN pg_attribute ra
  ON ra.attrelid = c.confrelid AND ra.attnum = c.confkey[k.ordinality]
WHERE n.nspname::text = $1
  AND t.relname::text = $2
  AND c.contype IN ('p', 'u', 'f')
UNION ALL
SELECT
  'u' AS kind,
  ic.relname::text AS constraint_name,
  a.attname::text AS column_name,
  k.ordinality::text AS position,
  NULL AS referenced_table,
  NULL AS referenced_column
FROM pg_index i
JOIN pg_class t ON t.oid = i.indrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_class ic ON ic.oid = i.indexrelid
CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ordinality)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname::text = $1
  AND t.relname::text = $2
  AND i.indisunique
  AND NOT i.indisprimary
  AND NOT EXISTS (
    SELECT 1 FROM pg_constraint c2 WHERE c2.conindid = i.indexrelid
  )
ORDER BY 1, 2
"#;
