//! Static parameter schemas and annotation classification.
//!
//! A loader publishes a [`ToolSignature`] for every artifact. Annotations
//! stay plain strings (`int`, `Optional[dict]`, `list[str] | None`) and are
//! reduced to a coarse [`TypeClass`] by [`classify`], which is enough for
//! a caller to build a request schema.

use crate::callable::Args;
use crate::error::ToolFailure;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a parameter may be passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Positional-or-keyword.
    Positional,
    /// Keyword-only.
    Keyword,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// How it may be passed.
    pub kind: ParamKind,
    /// Annotation text as declared, if any.
    pub annotation: Option<String>,
    /// Default value. `Some(Value::Null)` is a declared `null` default,
    /// distinct from no default at all.
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required positional parameter with no annotation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Positional,
            annotation: None,
            default: None,
        }
    }

    /// Set the annotation.
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Set a default value, making the parameter optional.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Make the parameter keyword-only.
    pub fn keyword(mut self) -> Self {
        self.kind = ParamKind::Keyword;
        self
    }

    /// Whether a caller must supply this parameter.
    pub fn required(&self) -> bool {
        self.default.is_none()
    }
}

/// The ordered parameter schema plus return annotation of a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSignature {
    /// Parameters in declaration order.
    pub params: Vec<ParamSpec>,
    /// Return annotation text, if any.
    pub returns: Option<String>,
}

impl ToolSignature {
    /// Find a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Bind a caller's parameter mapping against this signature.
    ///
    /// Omitted optional parameters receive their defaults. Unknown or
    /// missing required parameters fail with a `TypeError`.
    pub fn bind(&self, supplied: &Args) -> Result<Args, ToolFailure> {
        if let Some(unknown) = supplied.keys().find(|k| self.param(k).is_none()) {
            return Err(ToolFailure::type_error(format!(
                "got an unexpected keyword argument '{unknown}'"
            )));
        }

        let mut bound = Args::new();
        let mut missing = Vec::new();
        for param in &self.params {
            match (supplied.get(&param.name), &param.default) {
                (Some(value), _) => {
                    bound.insert(param.name.clone(), value.clone());
                }
                (None, Some(default)) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                (None, None) => missing.push(format!("'{}'", param.name)),
            }
        }

        if !missing.is_empty() {
            return Err(ToolFailure::type_error(format!(
                "missing {} required argument{}: {}",
                missing.len(),
                if missing.len() == 1 { "" } else { "s" },
                missing.join(", ")
            )));
        }
        Ok(bound)
    }
}

/// Coarse type classification of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeClass {
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Real number.
    Float,
    /// Text.
    Str,
    /// Any container: sequence, mapping, set, or other generic.
    #[serde(rename = "json")]
    Structured,
    /// Unannotated, ambiguous, or unknown.
    Any,
}

/// An annotation as reported by `describe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Annotation text as declared.
    pub raw: Option<String>,
    /// Classification of `raw`.
    #[serde(rename = "type")]
    pub class: TypeClass,
}

impl TypeInfo {
    /// Classify an optional annotation.
    pub fn of(annotation: Option<&str>) -> Self {
        Self {
            raw: annotation.map(str::to_string),
            class: classify(annotation),
        }
    }
}

/// Classify an annotation string.
///
/// - Primitive names map directly (`bool`, `int`, `float`, `str` and
///   their spelled-out aliases).
/// - Containers, and any generic applied to arguments, are `Structured`.
/// - `Optional[T]`, `Union[T, None]` and `T | None` unwrap to `T` when
///   exactly one non-None member remains; several members give `Any`.
/// - No annotation, `Any`, `None` and unknown names give `Any`.
pub fn classify(annotation: Option<&str>) -> TypeClass {
    let Some(text) = annotation.map(str::trim).filter(|t| !t.is_empty()) else {
        return TypeClass::Any;
    };
    match TypeExpr::parse(text) {
        Some(expr) => expr.classify(),
        None => TypeClass::Any,
    }
}

const CONTAINERS: &[&str] = &[
    "list",
    "dict",
    "set",
    "tuple",
    "frozenset",
    "List",
    "Dict",
    "Set",
    "Tuple",
    "FrozenSet",
    "Sequence",
    "MutableSequence",
    "Mapping",
    "MutableMapping",
    "Iterable",
    "Collection",
    "object",
    "json",
];

#[derive(Debug, Clone, PartialEq)]
struct TypeExpr {
    name: String,
    args: Vec<TypeExpr>,
}

impl TypeExpr {
    fn parse(text: &str) -> Option<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.union()?;
        (parser.pos == parser.tokens.len()).then_some(expr)
    }

    fn classify(&self) -> TypeClass {
        // `typing.Optional` and `Optional` are the same thing here.
        let name = self.name.rsplit('.').next().unwrap_or(&self.name);
        match name {
            "Optional" | "Union" => unwrap_optional(&self.args),
            "bool" | "boolean" => TypeClass::Bool,
            "int" | "integer" => TypeClass::Int,
            "float" | "real" | "number" => TypeClass::Float,
            "str" | "string" | "text" => TypeClass::Str,
            "Any" | "None" | "NoneType" => TypeClass::Any,
            _ if CONTAINERS.contains(&name) => TypeClass::Structured,
            _ if !self.args.is_empty() => TypeClass::Structured,
            _ => TypeClass::Any,
        }
    }

    fn is_none(&self) -> bool {
        matches!(self.name.as_str(), "None" | "NoneType") && self.args.is_empty()
    }
}

fn unwrap_optional(members: &[TypeExpr]) -> TypeClass {
    let concrete: Vec<&TypeExpr> = members.iter().filter(|m| !m.is_none()).collect();
    match concrete.as_slice() {
        [only] => only.classify(),
        _ => TypeClass::Any,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Open,
    Close,
    Comma,
    Pipe,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            '[' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ']' => {
                tokens.push(Token::Close);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '|' => {
                tokens.push(Token::Pipe);
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '\'' || c == '"' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else if c == '\'' || c == '"' {
                        // Quoted forward references: `'MyType'`.
                        chars.next();
                    } else {
                        break;
                    }
                }
                if ident.is_empty() {
                    return None;
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn union(&mut self) -> Option<TypeExpr> {
        let first = self.primary()?;
        let mut members = vec![first];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            members.push(self.primary()?);
        }
        if members.len() == 1 {
            members.pop()
        } else {
            Some(TypeExpr {
                name: "Union".into(),
                args: members,
            })
        }
    }

    fn primary(&mut self) -> Option<TypeExpr> {
        match self.tokens.get(self.pos).cloned()? {
            Token::Ident(name) => {
                self.pos += 1;
                let args = if self.peek() == Some(&Token::Open) {
                    self.pos += 1;
                    self.list()?
                } else {
                    Vec::new()
                };
                Some(TypeExpr { name, args })
            }
            // A bare bracket group, as in `Callable[[int], str]`.
            Token::Open => {
                self.pos += 1;
                let args = self.list()?;
                Some(TypeExpr {
                    name: "list".into(),
                    args,
                })
            }
            _ => None,
        }
    }

    /// Parse `a, b, c]` after an opening bracket.
    fn list(&mut self) -> Option<Vec<TypeExpr>> {
        let mut items = Vec::new();
        if self.peek() == Some(&Token::Close) {
            self.pos += 1;
            return Some(items);
        }
        loop {
            items.push(self.union()?);
            match self.peek()? {
                Token::Comma => self.pos += 1,
                Token::Close => {
                    self.pos += 1;
                    return Some(items);
                }
                _ => return None,
            }
        }
    }
}
