//! Raw query document to [`Expr`] translation.
//!
//! All structural validation happens here: operand shapes, registry lookups, regex
//! compilation and nesting depth. A query that parses can be evaluated against any
//! document without error.

use bson::{Bson, Document};

use crate::{
    error::{QueryError, QueryResult},
    options::QueryOptions,
    path::FieldPath,
    query::{BitTest, Condition, ElemMatch, Expr, Member},
    registry::{ExpressionOperator, FieldOperator, is_operator},
    value::{BsonType, Number, QueryRegex, binary_bytes, truthy},
};


/// How the keys of a condition document classify.
enum Shape {
    /// Every key is `$`-prefixed.
    Operators,
    /// No key is `$`-prefixed (or there are no keys).
    Literal,
    /// Both kinds of key; carries the first operator key.
    Mixed(String),
}

fn shape(doc: &Document) -> Shape {
    let operators = doc.keys().filter(|key| is_operator(key)).count();

    if operators == 0 {
        Shape::Literal
    } else if operators == doc.len() {
        Shape::Operators
    } else {
        let first = doc
            .keys()
            .find(|key| is_operator(key))
            .cloned()
            .unwrap_or_default();

        Shape::Mixed(first)
    }
}

/// Renders `{ operator: operand }` for error messages.
fn wrap(operator: &str, operand: &Bson) -> Bson {
    let mut doc = Document::new();
    doc.insert(operator, operand.clone());
    Bson::Document(doc)
}

pub(crate) struct Parser<'o> {
    options: &'o QueryOptions,
}

impl<'o> Parser<'o> {
    pub(crate) fn new(options: &'o QueryOptions) -> Self {
        Self { options }
    }

    fn invalid(&self, operator: &str, message: impl Into<String>, operand: &Bson) -> QueryError {
        QueryError::invalid_query(
            operator,
            message,
            &wrap(operator, operand),
            self.options.expr_render_limit,
        )
    }

    /// Returns the depth one level below `depth`, or an error past the limit.
    fn descend(&self, operator: &str, operand: &Bson, depth: usize) -> QueryResult<usize> {
        let next = depth + 1;

        if next > self.options.max_depth {
            return Err(self.invalid(
                operator,
                format!("query exceeds the maximum nesting depth of {}", self.options.max_depth),
                operand,
            ));
        }

        Ok(next)
    }

    /// Parses a document in root position: an implicit `$and` over its keys.
    pub(crate) fn parse_root(&self, doc: &Document, depth: usize) -> QueryResult<Expr> {
        let mut children = Vec::with_capacity(doc.len());

        for (key, value) in doc {
            if is_operator(key) {
                match ExpressionOperator::lookup(key)? {
                    ExpressionOperator::And => children.push(Expr::And(self.parse_logical(key, value, depth)?)),
                    ExpressionOperator::Or => children.push(Expr::Or(self.parse_logical(key, value, depth)?)),
                    ExpressionOperator::Nor => children.push(Expr::Nor(self.parse_logical(key, value, depth)?)),
                    ExpressionOperator::Comment => {}
                }
            } else {
                children.push(self.parse_field(key, value, depth)?);
            }
        }

        Ok(Expr::And(children))
    }

    fn parse_logical(&self, operator: &str, operand: &Bson, depth: usize) -> QueryResult<Vec<Expr>> {
        let items = match operand {
            Bson::Array(items) if !items.is_empty() => items,
            Bson::Array(_) => return Err(self.invalid(operator, "argument must be a non-empty array", operand)),
            _ => return Err(self.invalid(operator, "argument must be an array", operand)),
        };

        let depth = self.descend(operator, operand, depth)?;

        items
            .iter()
            .map(|item| match item {
                Bson::Document(doc) => self.parse_root(doc, depth),
                _ => Err(self.invalid(operator, "every entry must be an object", operand)),
            })
            .collect()
    }

    fn parse_field(&self, path: &str, value: &Bson, depth: usize) -> QueryResult<Expr> {
        let path = FieldPath::parse(path, self.options)?;
        let conditions = self.parse_conditions(value, depth)?;

        Ok(Expr::Field { path, conditions })
    }

    /// Parses the value attached to a field path.
    ///
    /// A bare regex implies `$regex`, an operator document holds one condition per
    /// operator, and anything else (including a document of plain keys) implies `$eq`.
    fn parse_conditions(&self, value: &Bson, depth: usize) -> QueryResult<Vec<Condition>> {
        match value {
            Bson::RegularExpression(regex) => {
                let compiled = QueryRegex::compile(
                    regex.pattern.as_str(),
                    regex.options.as_str(),
                    FieldOperator::Regex.as_str(),
                    value,
                    self.options,
                )?;

                Ok(vec![Condition::Regex(compiled)])
            }
            Bson::Document(doc) => match shape(doc) {
                Shape::Operators => self.parse_operator_map(doc, depth),
                Shape::Literal => Ok(vec![Condition::Eq(value.clone())]),
                Shape::Mixed(operator) => Err(QueryError::invalid_query(
                    operator,
                    "cannot mix operators and plain fields in one condition",
                    value,
                    self.options.expr_render_limit,
                )),
            }
            _ => Ok(vec![Condition::Eq(value.clone())]),
        }
    }

    /// Parses a document whose keys are all field operators.
    fn parse_operator_map(&self, doc: &Document, depth: usize) -> QueryResult<Vec<Condition>> {
        let flags = doc.get(FieldOperator::Options.as_str());

        if let Some(flags) = flags {
            if !doc.contains_key(FieldOperator::Regex.as_str()) {
                return Err(self.invalid("$options", "$options needs a $regex", flags));
            }
        }

        let mut conditions = Vec::with_capacity(doc.len());

        for (key, operand) in doc {
            match FieldOperator::lookup(key)? {
                FieldOperator::Options => {}
                FieldOperator::Regex => conditions.push(self.parse_regex(operand, flags)?),
                operator => conditions.push(self.parse_operator(operator, operand, depth)?),
            }
        }

        Ok(conditions)
    }

    fn parse_operator(&self, operator: FieldOperator, operand: &Bson, depth: usize) -> QueryResult<Condition> {
        let name = operator.as_str();

        let condition = match operator {
            FieldOperator::Eq => Condition::Eq(operand.clone()),
            FieldOperator::Ne => Condition::Ne(self.plain_operand(name, operand)?),
            FieldOperator::Gt => Condition::Gt(self.plain_operand(name, operand)?),
            FieldOperator::Gte => Condition::Gte(self.plain_operand(name, operand)?),
            FieldOperator::Lt => Condition::Lt(self.plain_operand(name, operand)?),
            FieldOperator::Lte => Condition::Lte(self.plain_operand(name, operand)?),
            FieldOperator::In => Condition::In(self.parse_members(name, operand, depth)?),
            FieldOperator::Nin => Condition::Nin(self.parse_members(name, operand, depth)?),
            FieldOperator::All => Condition::All(self.parse_members(name, operand, depth)?),
            FieldOperator::Size => Condition::Size(self.parse_size(operand)?),
            FieldOperator::Exists => Condition::Exists(truthy(operand)),
            FieldOperator::Type => Condition::Type(self.parse_types(operand)?),
            FieldOperator::Mod => self.parse_mod(operand)?,
            FieldOperator::Regex => self.parse_regex(operand, None)?,
            FieldOperator::Options => return Err(self.invalid(name, "$options needs a $regex", operand)),
            FieldOperator::ElemMatch => Condition::ElemMatch(self.parse_elem_match(operand, depth)?),
            FieldOperator::Not => Condition::Not(self.parse_not(operand, depth)?),
            FieldOperator::BitsAllSet => self.parse_bits(BitTest::AllSet, name, operand)?,
            FieldOperator::BitsAllClear => self.parse_bits(BitTest::AllClear, name, operand)?,
            FieldOperator::BitsAnySet => self.parse_bits(BitTest::AnySet, name, operand)?,
            FieldOperator::BitsAnyClear => self.parse_bits(BitTest::AnyClear, name, operand)?,
        };

        Ok(condition)
    }

    /// Operands of `$ne` and the ordering operators cannot be regexes.
    fn plain_operand(&self, operator: &str, operand: &Bson) -> QueryResult<Bson> {
        match operand {
            Bson::RegularExpression(_) => Err(self.invalid(operator, "cannot take a regular expression", operand)),
            _ => Ok(operand.clone()),
        }
    }

    fn parse_regex(&self, pattern: &Bson, flags: Option<&Bson>) -> QueryResult<Condition> {
        let (source, inline) = match pattern {
            Bson::String(source) => (source.as_str(), ""),
            Bson::RegularExpression(regex) => (regex.pattern.as_str(), regex.options.as_str()),
            _ => return Err(self.invalid("$regex", "$regex has to be a string", pattern)),
        };

        let flags = match flags {
            None => inline,
            Some(Bson::String(extra)) if inline.is_empty() => extra.as_str(),
            Some(Bson::String(extra)) if extra.is_empty() => inline,
            Some(Bson::String(_)) => {
                return Err(self.invalid("$options", "options set in both $regex and $options", pattern));
            }
            Some(other) => return Err(self.invalid("$options", "$options has to be a string", other)),
        };

        let regex = QueryRegex::compile(
            source,
            flags,
            FieldOperator::Regex.as_str(),
            &wrap(FieldOperator::Regex.as_str(), pattern),
            self.options,
        )?;

        Ok(Condition::Regex(regex))
    }

    /// Parses the array operand of `$in`, `$nin` and `$all`.
    fn parse_members(&self, operator: &str, operand: &Bson, depth: usize) -> QueryResult<Vec<Member>> {
        let items = match operand {
            Bson::Array(items) => items,
            _ => return Err(self.invalid(operator, "needs an array", operand)),
        };

        items
            .iter()
            .map(|item| match item {
                Bson::RegularExpression(regex) => QueryRegex::compile(
                    regex.pattern.as_str(),
                    regex.options.as_str(),
                    operator,
                    operand,
                    self.options,
                )
                .map(Member::Regex),
                Bson::Document(doc) if operator == "$all" && doc.len() == 1 && doc.contains_key("$elemMatch") => {
                    let inner = doc.get("$elemMatch").unwrap_or(&Bson::Null);
                    self.parse_elem_match(inner, depth).map(Member::ElemMatch)
                }
                Bson::Document(doc) if doc.keys().any(|key| is_operator(key)) => {
                    Err(self.invalid(operator, "cannot contain operator expressions", operand))
                }
                other => Ok(Member::Value(other.clone())),
            })
            .collect()
    }

    fn parse_size(&self, operand: &Bson) -> QueryResult<usize> {
        let size = Number::from_bson(operand)
            .ok_or_else(|| self.invalid("$size", "needs a number", operand))?
            .as_integral()
            .ok_or_else(|| self.invalid("$size", "must be a whole number", operand))?;

        usize::try_from(size).map_err(|_| self.invalid("$size", "may not be negative", operand))
    }

    fn parse_types(&self, operand: &Bson) -> QueryResult<Vec<BsonType>> {
        let selector = |item: &Bson| {
            let parsed = match item {
                Bson::String(alias) => BsonType::from_alias(alias),
                other => Number::from_bson(other)
                    .and_then(Number::as_integral)
                    .and_then(BsonType::from_code),
            };

            parsed.ok_or_else(|| self.invalid("$type", "unknown type selector", operand))
        };

        match operand {
            Bson::Array(items) if items.is_empty() => {
                Err(self.invalid("$type", "must match at least one type", operand))
            }
            Bson::Array(items) => items.iter().map(selector).collect(),
            single => Ok(vec![selector(single)?]),
        }
    }

    fn parse_mod(&self, operand: &Bson) -> QueryResult<Condition> {
        let items = match operand {
            Bson::Array(items) if items.len() == 2 => items,
            Bson::Array(_) => return Err(self.invalid("$mod", "needs exactly two elements", operand)),
            _ => return Err(self.invalid("$mod", "needs an array", operand)),
        };

        let mut numbers = items.iter().map(|item| {
            Number::from_bson(item)
                .and_then(Number::truncate)
                .ok_or_else(|| self.invalid("$mod", "elements must be finite numbers", operand))
        });

        let divisor = numbers.next().unwrap_or(Ok(0))?;
        let remainder = numbers.next().unwrap_or(Ok(0))?;

        if divisor == 0 {
            return Err(self.invalid("$mod", "divisor cannot be 0", operand));
        }

        Ok(Condition::Mod { divisor, remainder })
    }

    fn parse_elem_match(&self, operand: &Bson, depth: usize) -> QueryResult<ElemMatch> {
        let doc = match operand {
            Bson::Document(doc) => doc,
            _ => return Err(self.invalid("$elemMatch", "needs an object", operand)),
        };

        let depth = self.descend("$elemMatch", operand, depth)?;

        let value_form = !doc.is_empty()
            && doc
                .keys()
                .all(|key| is_operator(key) && ExpressionOperator::lookup(key).is_err());

        if value_form {
            Ok(ElemMatch::Value(self.parse_operator_map(doc, depth)?))
        } else {
            Ok(ElemMatch::Object(Box::new(self.parse_root(doc, depth)?)))
        }
    }

    fn parse_not(&self, operand: &Bson, depth: usize) -> QueryResult<Vec<Condition>> {
        let depth = self.descend("$not", operand, depth)?;

        match operand {
            Bson::RegularExpression(_) => Ok(vec![self.parse_regex(operand, None)?]),
            Bson::Document(doc) if doc.is_empty() => Err(self.invalid("$not", "cannot be empty", operand)),
            Bson::Document(doc) => match shape(doc) {
                Shape::Operators => self.parse_operator_map(doc, depth),
                _ => Err(self.invalid("$not", "only takes operator expressions", operand)),
            }
            _ => Err(self.invalid("$not", "needs a regex or a document", operand)),
        }
    }

    fn parse_bits(&self, test: BitTest, operator: &str, operand: &Bson) -> QueryResult<Condition> {
        let invalid = || {
            self.invalid(
                operator,
                "takes a non-negative integer mask, an array of bit positions or binary data",
                operand,
            )
        };

        let positions = if let Some(bytes) = binary_bytes(operand) {
            bytes
                .iter()
                .enumerate()
                .flat_map(|(index, byte)| {
                    (0..8u32)
                        .filter(move |bit| byte & (1u8 << *bit) != 0)
                        .map(move |bit| index as u32 * 8 + bit)
                })
                .collect()
        } else if let Bson::Array(items) = operand {
            items
                .iter()
                .map(|item| {
                    Number::from_bson(item)
                        .and_then(Number::as_integral)
                        .and_then(|position| u32::try_from(position).ok())
                        .ok_or_else(invalid)
                })
                .collect::<QueryResult<Vec<_>>>()?
        } else {
            let mask = Number::from_bson(operand)
                .and_then(Number::as_integral)
                .filter(|mask| *mask >= 0)
                .ok_or_else(invalid)?;

            (0..63u32).filter(|bit| mask & (1i64 << *bit) != 0).collect()
        };

        Ok(Condition::Bits { test, positions })
    }
}
