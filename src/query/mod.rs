//! Operator-supplied projections and filters over stored entities.
//!
//! A [`Query`] names fields by their json names. Before anything reaches a
//! store it is resolved against the entity's allow-list into a
//! [`ResolvedQuery`], which only refers to fixed storage columns and carries
//! filter values that were checked against the column's kind. A query naming
//! any field outside the allow-list is rejected whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::campaign::CampaignStatus;
use crate::error::Error;

pub mod db;

pub type Record = serde_json::Map<String, Value>;

pub const DEFAULT_MAX_RESULTS: u32 = 1000;

#[derive(Clone, Debug)]
pub struct QuerySettings {
    pub max_results: u32,
}

impl Default for QuerySettings {
    fn default() -> QuerySettings {
        QuerySettings {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Campaign,
    Result,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    TextList,
    Bool,
    Timestamp,
    Status,
    // projectable only
    Document,
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> Field {
    Field { name, column, kind }
}

const CAMPAIGN_FIELDS: &[Field] = &[
    field("ID", "_id", FieldKind::Integer),
    field("Name", "name", FieldKind::Text),
    field("Targets", "targets", FieldKind::TextList),
    field("Passwords", "passwords", FieldKind::TextList),
    field("Provider", "provider", FieldKind::Text),
    field("ProviderMetadata", "provider_metadata", FieldKind::Document),
    field("NotBefore", "not_before", FieldKind::Timestamp),
    field("NotAfter", "not_after", FieldKind::Timestamp),
    field("ScheduleInterval", "schedule_interval", FieldKind::Integer),
    field("Status", "status", FieldKind::Status),
    field("CreatedAt", "created_at", FieldKind::Timestamp),
    field("ModifiedAt", "modified_at", FieldKind::Timestamp),
];

const RESULT_FIELDS: &[Field] = &[
    field("ID", "_id", FieldKind::Integer),
    field("CampaignID", "campaign_id", FieldKind::Integer),
    field("Username", "username", FieldKind::Text),
    field("Password", "password", FieldKind::Text),
    field("Valid", "valid", FieldKind::Bool),
    field("Locked", "locked", FieldKind::Bool),
    field("MFA", "mfa", FieldKind::Bool),
    field("CreatedAt", "created_at", FieldKind::Timestamp),
];

impl EntityKind {
    pub fn fields(self) -> &'static [Field] {
        match self {
            EntityKind::Campaign => CAMPAIGN_FIELDS,
            EntityKind::Result => RESULT_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Result<&'static Field, Error> {
        self.fields()
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::UnknownQueryField {
                entity: self,
                field: name.to_owned(),
            })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Query {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filter: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<FilterValue>),
}

#[derive(Debug)]
pub struct Condition {
    pub column: &'static str,
    pub op: Operator,
    pub value: FilterValue,
}

#[derive(Debug)]
pub struct ResolvedQuery {
    pub entity: EntityKind,
    pub projection: Vec<&'static Field>,
    pub conditions: Vec<Condition>,
    pub limit: u32,
}

impl Query {
    #[tracing::instrument]
    pub fn resolve(&self, entity: EntityKind, max_results: u32) -> Result<ResolvedQuery, Error> {
        let mut projection: Vec<&'static Field> = vec![];
        for name in &self.fields {
            let field = entity.field(name)?;
            if !projection.iter().any(|f| f.name == field.name) {
                projection.push(field);
            }
        }
        if projection.is_empty() {
            projection = entity.fields().iter().collect();
        }

        let conditions = self
            .filter
            .iter()
            .map(|predicate| {
                let field = entity.field(&predicate.field)?;
                let value = filter_value(field, predicate.op, &predicate.value)?;
                Ok(Condition {
                    column: field.column,
                    op: predicate.op,
                    value,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let limit = match self.limit {
            Some(0) => {
                return Err(Error::InvalidQueryValue {
                    field: "Limit".into(),
                    reason: "must be greater than zero".into(),
                })
            }
            Some(limit) => limit.min(max_results),
            None => max_results,
        };

        Ok(ResolvedQuery {
            entity,
            projection,
            conditions,
            limit,
        })
    }
}

impl ResolvedQuery {
    /// Reduces the json rendering of `body` to the projected fields.
    pub fn project<T: Serialize>(&self, body: &T) -> Result<Record, Error> {
        let mut rendered = match serde_json::to_value(body)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::ExistentialState(format!(
                    "{:?} rendered as a non-object: {}",
                    self.entity, other
                )))
            }
        };

        let mut record = Record::new();
        for field in &self.projection {
            let value = rendered.remove(field.name).unwrap_or(Value::Null);
            record.insert(field.name.to_owned(), value);
        }

        Ok(record)
    }
}

fn filter_value(field: &Field, op: Operator, value: &Value) -> Result<FilterValue, Error> {
    let invalid = |reason: &str| Error::InvalidQueryValue {
        field: field.name.to_owned(),
        reason: reason.to_owned(),
    };

    if field.kind == FieldKind::Document {
        return Err(invalid("field cannot be filtered"));
    }

    match (op, value) {
        (Operator::In, Value::Array(values)) => values
            .iter()
            .map(|value| scalar_value(field, value).map_err(|reason| invalid(reason)))
            .collect::<Result<Vec<_>, Error>>()
            .map(FilterValue::List),
        (Operator::In, _) => Err(invalid("In expects a list of values")),
        (_, value) => scalar_value(field, value).map_err(|reason| invalid(reason)),
    }
}

fn scalar_value(field: &Field, value: &Value) -> Result<FilterValue, &'static str> {
    match field.kind {
        FieldKind::Integer => value
            .as_i64()
            .map(FilterValue::Integer)
            .ok_or("expected an integer"),
        FieldKind::Text | FieldKind::TextList => value
            .as_str()
            .map(|text| FilterValue::Text(text.to_owned()))
            .ok_or("expected a string"),
        FieldKind::Bool => value.as_bool().map(FilterValue::Bool).ok_or("expected a boolean"),
        FieldKind::Timestamp => value
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|timestamp| FilterValue::Timestamp(timestamp.with_timezone(&Utc)))
            .ok_or("expected an RFC 3339 timestamp"),
        FieldKind::Status => serde_json::from_value::<CampaignStatus>(value.clone())
            .map(|status| FilterValue::Text(status.as_str().to_owned()))
            .map_err(|_| "expected a campaign status"),
        FieldKind::Document => Err("field cannot be filtered"),
    }
}
