// Catalog queries against the sys.* views. Everything is cast to nvarchar on
// the server so result rows come back as uniform string columns; the
// `{object_id_literal}` placeholder is replaced with a quoted
// `OBJECT_ID(...)` argument per table.

pub(crate) const SHOW_SERVER_VERSION_QUERY: &str =
    "SELECT CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128));";

pub(crate) const SCHEMAS_QUERY: &str = r"
SELECT s.name
FROM sys.schemas s
WHERE s.schema_id < 16384
  AND s.name NOT IN ('dbo', 'sys', 'guest', 'INFORMATION_SCHEMA')
ORDER BY s.name;
";

pub(crate) const SEQUENCES_QUERY: &str = r"
SELECT SCHEMA_NAME(sq.schema_id),
       sq.name,
       CAST(sq.start_value AS nvarchar(40)),
       CAST(sq.increment AS nvarchar(40)),
       CAST(sq.cache_size AS nvarchar(40)),
       CAST(sq.is_cycling AS nvarchar(1))
FROM sys.sequences sq
ORDER BY SCHEMA_NAME(sq.schema_id), sq.name;
";

pub(crate) const TABLE_NAMES_QUERY: &str = r"
SELECT SCHEMA_NAME(t.schema_id), t.name
FROM sys.tables t
WHERE t.is_ms_shipped = 0
ORDER BY SCHEMA_NAME(t.schema_id), t.name;
";

pub(crate) const COLUMN_DEFINITIONS_QUERY_TEMPLATE: &str = r"
SELECT c.name,
       tp.name,
       CAST(c.max_length AS nvarchar(10)),
       CAST(c.precision AS nvarchar(10)),
       CAST(c.scale AS nvarchar(10)),
       CAST(c.is_nullable AS nvarchar(1)),
       CAST(c.is_identity AS nvarchar(1)),
       dc.definition,
       cc.definition,
       CAST(ISNULL(cc.is_persisted, 0) AS nvarchar(1))
FROM sys.columns c
JOIN sys.types tp ON tp.user_type_id = c.user_type_id
LEFT JOIN sys.default_constraints dc
  ON dc.parent_object_id = c.object_id AND dc.parent_column_id = c.column_id
LEFT JOIN sys.computed_columns cc
  ON cc.object_id = c.object_id AND cc.column_id = c.column_id
WHERE c.object_id = OBJECT_ID({object_id_literal})
ORDER BY c.column_id;
";

pub(crate) const PRIMARY_KEY_QUERY_TEMPLATE: &str = r"
SELECT i.name, col.name
FROM sys.indexes i
JOIN sys.index_columns ic
  ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns col
  ON col.object_id = ic.object_id AND col.column_id = ic.column_id
WHERE i.object_id = OBJECT_ID({object_id_literal}) AND i.is_primary_key = 1
ORDER BY ic.key_ordinal;
";

// Secondary indexes and UNIQUE constraints share sys.indexes; the
// is_unique_constraint flag distinguishes the two.
pub(crate) const INDEXES_QUERY_TEMPLATE: &str = r"
SELECT i.name,
       CAST(i.is_unique AS nvarchar(1)),
       CAST(i.is_unique_constraint AS nvarchar(1)),
       i.filter_definition,
       col.name,
       CAST(ic.is_descending_key AS nvarchar(1))
FROM sys.indexes i
JOIN sys.index_columns ic
  ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns col
  ON col.object_id = ic.object_id AND col.column_id = ic.column_id
WHERE i.object_id = OBJECT_ID({object_id_literal})
  AND i.is_primary_key = 0
  AND i.type > 0
  AND ic.is_included_column = 0
ORDER BY i.name, ic.key_ordinal;
";

pub(crate) const CHECK_CONSTRAINTS_QUERY_TEMPLATE: &str = r"
SELECT ck.name, ck.definition
FROM sys.check_constraints ck
WHERE ck.parent_object_id = OBJECT_ID({object_id_literal})
ORDER BY ck.name;
";

pub(crate) const FOREIGN_KEYS_QUERY_TEMPLATE: &str = r"
SELECT fk.name,
       pc.name,
       SCHEMA_NAME(rt.schema_id),
       rt.name,
       rc.name,
       fk.delete_referential_action_desc,
       fk.update_referential_action_desc
FROM sys.foreign_keys fk
JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.columns pc
  ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
JOIN sys.columns rc
  ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE fk.parent_object_id = OBJECT_ID({object_id_literal})
ORDER BY fk.name, fkc.constraint_column_id;
";

// Module definitions are the original CREATE statements, verbatim.
pub(crate) const VIEWS_QUERY: &str = r"
SELECT m.definition
FROM sys.views v
JOIN sys.sql_modules m ON m.object_id = v.object_id
WHERE v.is_ms_shipped = 0
ORDER BY SCHEMA_NAME(v.schema_id), v.name;
";

pub(crate) const TRIGGERS_QUERY: &str = r"
SELECT m.definition
FROM sys.triggers tr
JOIN sys.sql_modules m ON m.object_id = tr.object_id
WHERE tr.is_ms_shipped = 0 AND tr.parent_class = 1
ORDER BY tr.name;
";
