use std::fmt;

use tessera_api::error::CodecError;

/// Declared column type, in the `columns.types` grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Varchar(usize),
    Char(usize),
    Binary,
    Date,
    Timestamp,
    Array(Box<TypeInfo>),
    Map(Box<TypeInfo>, Box<TypeInfo>),
    Struct(Vec<(String, TypeInfo)>),
}

impl TypeInfo {
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CodecError::config("empty type declaration"));
        }

        if let Some((head, args)) = split_arguments(text, '<', '>')? {
            return match head.as_str() {
                "array" => Ok(TypeInfo::Array(Box::new(TypeInfo::parse(args)?))),
                "map" => match split_top_level(args)?.as_slice() {
                    [k, v] => Ok(TypeInfo::Map(
                        Box::new(TypeInfo::parse(k)?),
                        Box::new(TypeInfo::parse(v)?),
                    )),
                    other => Err(CodecError::config(format!(
                        "map<...> takes 2 type arguments, got {} in '{text}'",
                        other.len()
                    ))),
                },
                "struct" => {
                    let mut fields = Vec::new();
                    for member in split_top_level(args)? {
                        let (name, ty) = member.split_once(':').ok_or_else(|| {
                            CodecError::config(format!("struct member '{member}' has no ':'"))
                        })?;
                        let name = name.trim();
                        if name.is_empty() {
                            return Err(CodecError::config(format!(
                                "struct member '{member}' has an empty name"
                            )));
                        }
                        fields.push((name.to_string(), TypeInfo::parse(ty)?));
                    }
                    Ok(TypeInfo::Struct(fields))
                }
                other => Err(CodecError::unsupported(format!("unknown type '{other}<...>'"))),
            };
        }

        if let Some((head, args)) = split_arguments(text, '(', ')')? {
            let length = |kind: &str| {
                args.trim().parse::<usize>().map_err(|_| {
                    CodecError::config(format!("{kind} length '{}' is not a number", args.trim()))
                })
            };
            return match head.as_str() {
                "varchar" => Ok(TypeInfo::Varchar(length("varchar")?)),
                "char" => Ok(TypeInfo::Char(length("char")?)),
                other => Err(CodecError::unsupported(format!("unknown type '{other}(...)'"))),
            };
        }

        match text.to_ascii_lowercase().as_str() {
            "boolean" => Ok(TypeInfo::Boolean),
            "tinyint" => Ok(TypeInfo::TinyInt),
            "smallint" => Ok(TypeInfo::SmallInt),
            "int" | "integer" => Ok(TypeInfo::Int),
            "bigint" => Ok(TypeInfo::BigInt),
            "float" => Ok(TypeInfo::Float),
            "double" => Ok(TypeInfo::Double),
            "string" => Ok(TypeInfo::String),
            "binary" => Ok(TypeInfo::Binary),
            "date" => Ok(TypeInfo::Date),
            "timestamp" => Ok(TypeInfo::Timestamp),
            _ => Err(CodecError::unsupported(format!("unknown type '{text}'"))),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Boolean => f.write_str("boolean"),
            TypeInfo::TinyInt => f.write_str("tinyint"),
            TypeInfo::SmallInt => f.write_str("smallint"),
            TypeInfo::Int => f.write_str("int"),
            TypeInfo::BigInt => f.write_str("bigint"),
            TypeInfo::Float => f.write_str("float"),
            TypeInfo::Double => f.write_str("double"),
            TypeInfo::String => f.write_str("string"),
            TypeInfo::Varchar(n) => write!(f, "varchar({n})"),
            TypeInfo::Char(n) => write!(f, "char({n})"),
            TypeInfo::Binary => f.write_str("binary"),
            TypeInfo::Date => f.write_str("date"),
            TypeInfo::Timestamp => f.write_str("timestamp"),
            TypeInfo::Array(e) => write!(f, "array<{e}>"),
            TypeInfo::Map(k, v) => write!(f, "map<{k},{v}>"),
            TypeInfo::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{ty}")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// `head<args>` → `(head, args)`; `None` when `text` has no `open` bracket.
fn split_arguments(text: &str, open: char, close: char) -> Result<Option<(String, &str)>, CodecError> {
    let Some(start) = text.find(open) else {
        return Ok(None);
    };
    if !text.ends_with(close) {
        return Err(CodecError::config(format!(
            "unbalanced type declaration '{text}'"
        )));
    }
    let head = text[..start].trim().to_ascii_lowercase();
    Ok(Some((head, &text[start + 1..text.len() - 1])))
}

/// Split on commas that are not nested inside `<...>` or `(...)`.
pub fn split_top_level(text: &str) -> Result<Vec<&str>, CodecError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    CodecError::config(format!("unbalanced type declaration '{text}'"))
                })?;
            }
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CodecError::config(format!(
            "unbalanced type declaration '{text}'"
        )));
    }
    parts.push(text[start..].trim());
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_api::error::ErrorKind;

    #[test]
    fn nested_commas_do_not_split() {
        let parts = split_top_level("int, map<string,int>, struct<a:int,b:varchar(10)>").unwrap();
        assert_eq!(
            parts,
            vec!["int", "map<string,int>", "struct<a:int,b:varchar(10)>"]
        );
    }

    #[test]
    fn parses_nested_declarations() {
        let ty = TypeInfo::parse("struct<name:string,scores:array<int>,attrs:map<string,double>>")
            .unwrap();
        assert_eq!(
            ty,
            TypeInfo::Struct(vec![
                ("name".into(), TypeInfo::String),
                ("scores".into(), TypeInfo::Array(Box::new(TypeInfo::Int))),
                (
                    "attrs".into(),
                    TypeInfo::Map(Box::new(TypeInfo::String), Box::new(TypeInfo::Double))
                ),
            ])
        );
        assert_eq!(
            ty.to_string(),
            "struct<name:string,scores:array<int>,attrs:map<string,double>>"
        );
    }

    #[test]
    fn parameterized_strings() {
        assert_eq!(TypeInfo::parse("varchar(20)").unwrap(), TypeInfo::Varchar(20));
        assert_eq!(TypeInfo::parse("CHAR(3)").unwrap(), TypeInfo::Char(3));
        assert_eq!(
            TypeInfo::parse("varchar(x)").unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn unknown_type_is_unsupported() {
        assert_eq!(TypeInfo::parse("uniontype").unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(
            TypeInfo::parse("set<int>").unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn unbalanced_is_a_config_error() {
        assert_eq!(split_top_level("array<int").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(TypeInfo::parse("array<int").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(TypeInfo::parse("map<int>").unwrap_err().kind(), ErrorKind::Config);
    }
}
