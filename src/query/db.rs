use mongodb::bson::{self, Bson, Document};
use mongodb::options::FindOptions;

use super::{Condition, FilterValue, Operator, ResolvedQuery};

fn mongo_operator(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "$eq",
        Operator::Ne => "$ne",
        Operator::Lt => "$lt",
        Operator::Lte => "$lte",
        Operator::Gt => "$gt",
        Operator::Gte => "$gte",
        Operator::In => "$in",
    }
}

impl From<&FilterValue> for Bson {
    fn from(value: &FilterValue) -> Bson {
        match value {
            FilterValue::Integer(value) => Bson::Int64(*value),
            FilterValue::Text(value) => Bson::String(value.clone()),
            FilterValue::Bool(value) => Bson::Boolean(*value),
            FilterValue::Timestamp(value) => Bson::DateTime(bson::DateTime::from_chrono(*value)),
            FilterValue::List(values) => Bson::Array(values.iter().map(Bson::from).collect()),
        }
    }
}

fn condition_document(condition: &Condition) -> Document {
    let mut predicate = Document::new();
    predicate.insert(mongo_operator(condition.op), Bson::from(&condition.value));

    let mut document = Document::new();
    document.insert(condition.column, predicate);
    document
}

/// Every condition must hold. Columns come from the allow-list only.
pub fn filter_document(query: &ResolvedQuery) -> Document {
    if query.conditions.is_empty() {
        return bson::doc! {};
    }

    let clauses: Vec<Document> = query.conditions.iter().map(condition_document).collect();

    bson::doc! { "$and": clauses }
}

pub fn find_options(query: &ResolvedQuery) -> FindOptions {
    FindOptions::builder()
        .limit(i64::from(query.limit))
        .sort(bson::doc! { "_id": 1 })
        .build()
}
