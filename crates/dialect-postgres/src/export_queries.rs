pub(crate) const SHOW_SERVER_VERSION_QUERY: &str = "SHOW server_version";

pub(crate) const SCHEMAS_QUERY: &str = r#"
SELECT n.nspname AS schema_name
FROM pg_catalog.pg_namespace n
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast', 'public')
  AND n.nspname NOT LIKE 'pg_temp_%'
  AND n.nspname NOT LIKE 'pg_toast_temp_%'
ORDER BY n.nspname ASC;
"#;

pub(crate) const EXTENSIONS_QUERY: &str = r#"
SELECT e.extname AS extension_name
FROM pg_catalog.pg_extension e
WHERE e.extname <> 'plpgsql'
ORDER BY e.extname ASC;
"#;

pub(crate) const ENUMS_QUERY: &str = r#"
SELECT
  n.nspname AS type_schema,
  t.typname AS type_name,
  e.enumlabel AS enum_label
FROM pg_catalog.pg_type t
INNER JOIN pg_catalog.pg_namespace n ON t.typnamespace = n.oid
INNER JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
ORDER BY n.nspname ASC, t.typname ASC, e.enumsortorder ASC;
"#;

// Sequences owned by a column (serial, identity) are left out; they follow
// their table.
pub(crate) const SEQUENCES_QUERY: &str = r#"
SELECT
  n.nspname AS sequence_schema,
  c.relname AS sequence_name,
  s.seqincrement AS increment,
  s.seqmin AS min_value,
  s.seqmax AS max_value,
  s.seqstart AS start_value,
  s.seqcache AS cache_size,
  s.seqcycle AS cycle
FROM pg_catalog.pg_sequence s
INNER JOIN pg_catalog.pg_class c ON c.oid = s.seqrelid
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND NOT EXISTS (
    SELECT 1
    FROM pg_catalog.pg_depend d
    WHERE d.objid = c.oid
      AND d.deptype IN ('a', 'i')
  )
ORDER BY n.nspname ASC, c.relname ASC;
"#;

pub(crate) const TABLE_NAMES_QUERY: &str = r#"
SELECT
  n.nspname AS table_schema,
  c.relname AS table_name,
  CASE
    WHEN c.relkind = 'p' THEN pg_catalog.pg_get_partkeydef(c.oid)
    ELSE NULL
  END AS partition_key
FROM pg_catalog.pg_class c
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND c.relkind IN ('r', 'p')
  AND c.relpersistence = 'p'
  AND c.relispartition = false
  AND NOT EXISTS (
    SELECT 1
    FROM pg_catalog.pg_depend d
    WHERE c.oid = d.objid
      AND d.deptype = 'e'
  )
ORDER BY n.nspname ASC, c.relname ASC;
"#;

pub(crate) const TABLE_COLUMNS_QUERY: &str = r#"
SELECT
  a.attname AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS default_expr,
  a.attidentity <> '' AS is_identity,
  a.attgenerated <> '' AS is_generated,
  co.collname AS collation_name
FROM pg_catalog.pg_attribute a
INNER JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
LEFT JOIN pg_catalog.pg_collation co
  ON co.oid = a.attcollation AND co.collname <> 'default'
WHERE n.nspname = $1
  AND c.relname = $2
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum ASC;
"#;

pub(crate) const TABLE_CONSTRAINTS_QUERY: &str = r#"
SELECT
  con.conname AS constraint_name,
  con.contype AS constraint_type,
  pg_catalog.pg_get_constraintdef(con.oid, true) AS definition
FROM pg_catalog.pg_constraint con
INNER JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname = $1
  AND c.relname = $2
  AND con.contype IN ('p', 'u', 'c', 'f')
ORDER BY con.conname ASC;
"#;

// Indexes backing a constraint are exported through the constraint instead.
pub(crate) const INDEXES_QUERY: &str = r#"
SELECT
  n.nspname AS table_schema,
  c.relname AS table_name,
  pg_catalog.pg_get_indexdef(i.indexrelid) AS definition
FROM pg_catalog.pg_index i
INNER JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND NOT EXISTS (
    SELECT 1
    FROM pg_catalog.pg_constraint con
    WHERE con.conindid = i.indexrelid
  )
ORDER BY n.nspname ASC, c.relname ASC, i.indexrelid ASC;
"#;

pub(crate) const VIEWS_QUERY: &str = r#"
SELECT
  n.nspname AS view_schema,
  c.relname AS view_name,
  c.relkind = 'm' AS materialized,
  pg_catalog.pg_get_viewdef(c.oid, true) AS definition
FROM pg_catalog.pg_class c
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND c.relkind IN ('v', 'm')
ORDER BY n.nspname ASC, c.relname ASC;
"#;

pub(crate) const TRIGGERS_QUERY: &str = r#"
SELECT pg_catalog.pg_get_triggerdef(t.oid, true) AS definition
FROM pg_catalog.pg_trigger t
INNER JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid
INNER JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
WHERE n.nspname NOT IN ('information_schema', 'pg_catalog')
  AND NOT t.tgisinternal
ORDER BY n.nspname ASC, c.relname ASC, t.tgname ASC;
"#;

pub(crate) const POLICIES_QUERY: &str = r#"
SELECT
  p.schemaname AS table_schema,
  p.tablename AS table_name,
  p.policyname AS policy_name,
  p.permissive AS permissive,
  p.roles AS roles,
  p.cmd AS command,
  p.qual AS using_expr,
  p.with_check AS check_expr
FROM pg_catalog.pg_policies p
ORDER BY p.schemaname ASC, p.tablename ASC, p.policyname ASC;
"#;
