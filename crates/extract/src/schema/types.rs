use recon_protocol::FieldType;

/// Maps a declared type name onto the fixed field vocabulary.
///
/// `raw` is the bare type name with wrappers already removed (`Option<..>`, `[]`, `?`). Path
/// qualifiers are ignored, so `models.CharField`, `db.Integer` and `chrono::NaiveDate` all
/// normalize by their last segment.
pub fn normalize(raw: &str) -> FieldType {
    let head = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .split(['(', '<', '['])
        .next()
        .unwrap_or_default();
    let base = head.rsplit(['.', ':']).next().unwrap_or_default().trim();
    let lower = base.to_ascii_lowercase();

    match lower.as_str() {
        "id" | "uuid" | "uuidfield" | "objectid" | "autofield" | "bigautofield"
        | "smallautofield" | "serial" | "bigserial" | "smallserial" | "cuid" | "ulid"
        | "guid" => FieldType::Identifier,
        "string" | "str" | "text" | "varchar" | "char" | "character" | "nvarchar" | "nchar"
        | "tinytext" | "mediumtext" | "longtext" | "citext" | "charfield" | "textfield"
        | "slugfield" | "emailfield" | "urlfield" | "ipaddressfield" | "genericipaddressfield"
        | "filepathfield" | "unicode" | "unicodetext" | "enum" | "&str" | "rune" | "email"
        | "nullstring" => FieldType::String,
        "int" | "integer" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "tinyint"
        | "mediumint" | "long" | "short" | "byte" | "i8" | "i16" | "i32" | "i64" | "i128"
        | "isize" | "u8" | "u16" | "u32" | "u64" | "u128" | "usize" | "int16" | "int32"
        | "int64" | "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "integerfield"
        | "smallintegerfield" | "bigintegerfield" | "positiveintegerfield"
        | "positivesmallintegerfield" | "positivebigintegerfield" | "nullint64"
        | "nullint32" | "biginteger" | "smallinteger" => FieldType::Integer,
        "float" | "double" | "real" | "decimal" | "numeric" | "money" | "number" | "f32"
        | "f64" | "float32" | "float64" | "floatfield" | "decimalfield" | "bigdecimal"
        | "nullfloat64" | "double precision" => FieldType::Float,
        "bool" | "boolean" | "booleanfield" | "nullbooleanfield" | "nullbool" | "bit" => {
            FieldType::Boolean
        }
        "date" | "datetime" | "timestamp" | "timestamptz" | "time" | "timetz" | "interval"
        | "datefield" | "datetimefield" | "timefield" | "durationfield" | "naivedate"
        | "naivedatetime" | "naivetime" | "offsetdatetime" | "primitivedatetime"
        | "localdate" | "localdatetime" | "localtime" | "zoneddatetime" | "instant"
        | "nulltime" | "datetimeoffset" => FieldType::Date,
        _ => FieldType::Unknown,
    }
}
