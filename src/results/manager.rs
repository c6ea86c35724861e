use crate::database::Database;
use crate::error::Error;
use crate::query::{EntityKind, Query, Record};

use super::ResultBody;

#[tracing::instrument(skip(db))]
pub async fn select_results(
    db: &dyn Database,
    query: &Query,
    max_results: u32,
) -> Result<Vec<Record>, Error> {
    let resolved = query.resolve(EntityKind::Result, max_results)?;

    let results = db.results().select_results(&resolved).await?;

    results
        .into_iter()
        .map(|result| resolved.project(&ResultBody::render(result)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use serde_json::{json, Value};

    use super::*;
    use crate::campaign::CampaignId;
    use crate::database::test::MockDatabase;
    use crate::results::{ResultId, ResultRecord};

    fn result(id: u64, username: &str, valid: bool) -> ResultRecord {
        ResultRecord {
            id: ResultId::new(id),
            campaign_id: CampaignId::new(1),
            username: username.into(),
            password: "Winter2020!".into(),
            valid,
            locked: false,
            mfa: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn select_results_projects_each_record() {
        let mut db = MockDatabase::new();
        let called_select = Arc::new(Mutex::new(false));
        let called_select_clone = Arc::clone(&called_select);
        db.results.on_select_results = Box::new(move |query| {
            *called_select_clone.lock().unwrap() = true;
            assert_eq!(query.limit, 25);
            assert_eq!(query.conditions[0].column, "valid");
            Ok(vec![result(1, "alice", true), result(2, "bob", true)])
        });
        let query: Query = serde_json::from_value(json!({
            "Fields": ["Username", "Valid"],
            "Filter": [{ "Field": "Valid", "Op": "Eq", "Value": true }],
            "Limit": 25,
        }))
        .unwrap();

        let records = select_results(&db, &query, 1000).await.unwrap();

        let records: Vec<Value> = records.into_iter().map(Value::Object).collect();
        assert_eq!(
            records,
            vec![
                json!({ "Username": "alice", "Valid": true }),
                json!({ "Username": "bob", "Valid": true }),
            ]
        );
        assert!(
            *called_select.lock().unwrap(),
            "db.select_results was not called"
        );
    }

    #[tokio::test]
    async fn select_results_caps_limit() {
        let mut db = MockDatabase::new();
        db.results.on_select_results = Box::new(|query| {
            assert_eq!(query.limit, 1000);
            Ok(vec![])
        });

        let records = select_results(&db, &Query::default(), 1000).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn select_results_rejects_unknown_field_before_storage() {
        let db = MockDatabase::new();
        let query: Query =
            serde_json::from_value(json!({ "Fields": ["nonexistent_col"] })).unwrap();

        let error = select_results(&db, &query, 1000).await.unwrap_err();

        assert_eq!(
            error,
            Error::UnknownQueryField {
                entity: EntityKind::Result,
                field: "nonexistent_col".into(),
            }
        );
    }
}
