//! Translates the `where`/`sort`/`select`/`skip`/`limit`/`count` query
//! parameters shared by the list endpoints into a checked Mongo query.
//! Filters are validated against a per-resource field allow-list and a fixed
//! operator set before anything reaches the driver.

use futures_util::StreamExt;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::Value;

use crate::response::{with_string_id, ApiError};

const INVALID_PARAMETER: &str = "invalid request parameter";

/// Results are capped at 100 documents unless the request asks for fewer.
const DEFAULT_LIMIT: i64 = 100;

/// Comparison operators accepted inside a `where` clause.
const OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$exists",
];

/// Raw query string of a list endpoint. Everything arrives as an optional
/// string; `translate` turns it into a checked `ListQuery`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "where")]
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub select: Option<String>,
    pub skip: Option<String>,
    pub limit: Option<String>,
    pub count: Option<String>,
}

/// Query string of a single-entity GET.
#[derive(Debug, Default, Deserialize)]
pub struct SelectParams {
    pub select: Option<String>,
}

/// A fully validated list request, ready to run against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: u64,
    pub limit: i64,
    pub count_only: bool,
}

pub enum ListOutcome {
    Documents(Vec<Document>),
    Count(u64),
}

/// Translates raw list parameters against a resource's field allow-list.
/// Pure; touches no collection.
pub fn translate(params: &ListParams, fields: &[&str]) -> Result<ListQuery, ApiError> {
    let filter = match params.filter.as_deref() {
        Some(raw) => parse_filter(raw, fields)?,
        None => Document::new(),
    };
    let sort = match params.sort.as_deref() {
        Some(raw) => Some(parse_sort(raw, fields)?),
        None => None,
    };
    let projection = match params.select.as_deref() {
        Some(raw) => Some(parse_select(raw, fields)?),
        None => None,
    };
    let skip = match params.skip.as_deref() {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ApiError::MalformedParameter(INVALID_PARAMETER))?,
        None => 0,
    };
    let limit = match params.limit.as_deref() {
        Some(raw) => {
            let limit = raw
                .parse::<i64>()
                .map_err(|_| ApiError::MalformedParameter(INVALID_PARAMETER))?;
            if limit <= 0 {
                return Err(ApiError::MalformedParameter(INVALID_PARAMETER));
            }
            limit
        }
        None => DEFAULT_LIMIT,
    };
    let count_only = match params.count.as_deref() {
        Some(raw) => raw
            .parse::<bool>()
            .map_err(|_| ApiError::MalformedParameter(INVALID_PARAMETER))?,
        None => false,
    };

    Ok(ListQuery {
        filter,
        sort,
        projection,
        skip,
        limit,
        count_only,
    })
}

/// Runs a translated query. A count request goes straight to
/// `count_documents` and ignores sort/select/skip/limit.
pub async fn execute(
    collection: &Collection<Document>,
    query: ListQuery,
) -> Result<ListOutcome, ApiError> {
    if query.count_only {
        let total = collection.count_documents(query.filter).await?;
        return Ok(ListOutcome::Count(total));
    }

    let mut find = collection
        .find(query.filter)
        .skip(query.skip)
        .limit(query.limit);
    if let Some(sort) = query.sort {
        find = find.sort(sort);
    }
    if let Some(projection) = query.projection {
        find = find.projection(projection);
    }

    let mut cursor = find.await?;
    let mut results = Vec::new();
    while let Some(document) = cursor.next().await {
        results.push(with_string_id(document?));
    }
    Ok(ListOutcome::Documents(results))
}

/// Route ids are hex ObjectId strings; anything else reads as a missing
/// document, not a malformed request.
pub fn parse_object_id(raw: &str, not_found: &'static str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::NotFound(not_found))
}

pub fn parse_filter(raw: &str, fields: &[&str]) -> Result<Document, ApiError> {
    filter_document(json_object(raw)?, fields)
}

fn filter_document(
    clauses: serde_json::Map<String, Value>,
    fields: &[&str],
) -> Result<Document, ApiError> {
    let mut filter = Document::new();
    for (key, value) in clauses {
        if key == "$or" || key == "$and" {
            let branches = match value {
                Value::Array(branches) => branches,
                _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
            };
            let mut translated = Vec::with_capacity(branches.len());
            for branch in branches {
                match branch {
                    Value::Object(clauses) => {
                        translated.push(Bson::Document(filter_document(clauses, fields)?));
                    }
                    _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
                }
            }
            filter.insert(key, translated);
            continue;
        }

        if !fields.contains(&key.as_str()) {
            return Err(ApiError::MalformedParameter(INVALID_PARAMETER));
        }

        match value {
            Value::Object(operators) => {
                let mut clause = Document::new();
                for (operator, operand) in operators {
                    if !OPERATORS.contains(&operator.as_str()) {
                        return Err(ApiError::MalformedParameter(INVALID_PARAMETER));
                    }
                    clause.insert(operator, operand_bson(&key, operand)?);
                }
                filter.insert(key, clause);
            }
            literal => {
                let literal = operand_bson(&key, literal)?;
                filter.insert(key, literal);
            }
        }
    }
    Ok(filter)
}

/// JSON operand → BSON, mapping `_id` hex strings (and arrays of them, for
/// `$in`/`$nin`) onto native ObjectIds.
fn operand_bson(field: &str, value: Value) -> Result<Bson, ApiError> {
    let bson =
        Bson::try_from(value).map_err(|_| ApiError::MalformedParameter(INVALID_PARAMETER))?;
    if field != "_id" {
        return Ok(bson);
    }
    Ok(match bson {
        Bson::String(raw) => hex_to_object_id(raw),
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Bson::String(raw) => hex_to_object_id(raw),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    })
}

fn hex_to_object_id(raw: String) -> Bson {
    match ObjectId::parse_str(&raw) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(raw),
    }
}

pub fn parse_sort(raw: &str, fields: &[&str]) -> Result<Document, ApiError> {
    let mut sort = Document::new();
    for (key, value) in json_object(raw)? {
        if !fields.contains(&key.as_str()) {
            return Err(ApiError::MalformedParameter(INVALID_PARAMETER));
        }
        let direction = match &value {
            Value::Number(number) => match number.as_i64() {
                Some(1) => 1,
                Some(-1) => -1,
                _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
            },
            Value::String(word) => match word.as_str() {
                "asc" => 1,
                "desc" => -1,
                _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
            },
            _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
        };
        sort.insert(key, direction);
    }
    Ok(sort)
}

pub fn parse_select(raw: &str, fields: &[&str]) -> Result<Document, ApiError> {
    let mut projection = Document::new();
    for (key, value) in json_object(raw)? {
        if !fields.contains(&key.as_str()) {
            return Err(ApiError::MalformedParameter(INVALID_PARAMETER));
        }
        let include = match &value {
            Value::Number(number) => match number.as_i64() {
                Some(0) => 0,
                Some(1) => 1,
                _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
            },
            Value::Bool(true) => 1,
            Value::Bool(false) => 0,
            _ => return Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
        };
        projection.insert(key, include);
    }
    Ok(projection)
}

fn json_object(raw: &str) -> Result<serde_json::Map<String, Value>, ApiError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::MalformedParameter(INVALID_PARAMETER)),
    }
}
