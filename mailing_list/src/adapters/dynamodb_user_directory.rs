use crate::domain::{DirectoryError, ListId, User, UserDirectory, Username};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use telemetry::get_trace_and_span_id;

const USER_TYPE: &str = "User";
const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// User directory stored in a single DynamoDB table, one item per username.
///
/// Item layout: `PK` holds the username, `Type` is always `User`, and
/// `ListMembership` is present once the user has been enrolled.
#[derive(Debug, Clone)]
pub struct DynamoDbUserDirectory {
    client: Client,
    table_name: String,
}

impl DynamoDbUserDirectory {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    async fn get_user(&self, username: &Username) -> Result<Option<User>, DirectoryError> {
        let get_res = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(username.to_string()))
            .consistent_read(true)
            .send()
            .await
            .context(format!(
                "Failure reading record from DynamoDB. Using table {}",
                &self.table_name
            ))?;

        match get_res.item {
            None => Ok(None),
            Some(item) => Ok(Some(user_from_item(&item)?)),
        }
    }

    /// Write a user without membership, unless another writer already holds the key.
    ///
    /// Returns `false` when the conditional write lost to an existing item.
    async fn create_user(&self, user: &User) -> Result<bool, DirectoryError> {
        let trace_details = get_trace_and_span_id();

        let mut put_res_builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(user.username.to_string()))
            .item("Type", AttributeValue::S(USER_TYPE.to_string()))
            .condition_expression("attribute_not_exists(PK)".to_string());

        put_res_builder = match trace_details {
            None => put_res_builder,
            Some((trace_id, span_id)) => put_res_builder
                .item("TraceParent", AttributeValue::S(trace_id))
                .item("ParentSpan", AttributeValue::S(span_id)),
        };

        match put_res_builder.send().await {
            Ok(_) => Ok(true),
            Err(e) if is_conditional_check_failure(&e) => Ok(false),
            Err(e) => Err(anyhow::Error::from(e)
                .context(format!(
                    "Failure inserting record to DynamoDB. Using table {}",
                    &self.table_name
                ))
                .into()),
        }
    }
}

#[async_trait]
impl UserDirectory for DynamoDbUserDirectory {
    #[tracing::instrument(name = "Finding or creating user in DynamoDB", skip(self))]
    async fn find_or_create(&self, username: &Username) -> Result<User, DirectoryError> {
        if let Some(user) = self.get_user(username).await? {
            return Ok(user);
        }

        let user = User::new(username.clone());
        if self.create_user(&user).await? {
            return Ok(user);
        }

        // A concurrent enrollment created the record between our read and write.
        let winner = self.get_user(username).await?;
        user_after_lost_race(username, winner)
    }

    #[tracing::instrument(name = "Finding user in DynamoDB", skip(self))]
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, DirectoryError> {
        self.get_user(username).await
    }

    #[tracing::instrument(
        name = "Updating list membership in DynamoDB",
        skip(self, user),
        fields(username = %user.username)
    )]
    async fn update_list_membership(
        &self,
        user: &User,
        list_id: &ListId,
    ) -> Result<User, DirectoryError> {
        let trace_details = get_trace_and_span_id();

        let mut update_expression = "SET ListMembership = :list_id".to_string();
        let mut update_res_builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(user.username.to_string()))
            .condition_expression("attribute_exists(PK)")
            .expression_attribute_values(":list_id", AttributeValue::S(list_id.to_string()))
            .return_values(ReturnValue::AllNew);

        if let Some((trace_id, span_id)) = trace_details {
            update_expression.push_str(", TraceParent = :trace_parent, ParentSpan = :parent_span");
            update_res_builder = update_res_builder
                .expression_attribute_values(":trace_parent", AttributeValue::S(trace_id))
                .expression_attribute_values(":parent_span", AttributeValue::S(span_id));
        }

        let update_res = match update_res_builder
            .update_expression(update_expression)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_conditional_check_failure(&e) => {
                return Err(DirectoryError::RecordNotFound(format!(
                    "No user named {} exists.",
                    user.username
                )));
            }
            Err(e) => {
                return Err(anyhow::Error::from(e)
                    .context(format!(
                        "Failure updating record in DynamoDB. Using table {}",
                        &self.table_name
                    ))
                    .into());
            }
        };

        match update_res.attributes {
            Some(item) => user_from_item(&item),
            None => Err(anyhow!("DynamoDB returned no attributes for the updated user").into()),
        }
    }
}

fn is_conditional_check_failure(error: &impl ProvideErrorMetadata) -> bool {
    error.code() == Some(CONDITIONAL_CHECK_FAILED)
}

fn user_after_lost_race(username: &Username, winner: Option<User>) -> Result<User, DirectoryError> {
    winner.ok_or_else(|| {
        DirectoryError::UniquenessViolation(format!(
            "The username {} was claimed concurrently but could not be read back.",
            username
        ))
    })
}

fn user_from_item(item: &HashMap<String, AttributeValue>) -> Result<User, DirectoryError> {
    let username = item
        .get("PK")
        .and_then(|value| value.as_s().ok())
        .ok_or_else(|| anyhow!("User item is missing its PK attribute"))?;
    let username = Username::parse(username.clone()).map_err(|e| anyhow!(e))?;

    let list_membership = match item.get("ListMembership") {
        None => None,
        Some(value) => {
            let raw = value
                .as_s()
                .map_err(|_| anyhow!("ListMembership of {} is not a string", username))?;
            Some(ListId::parse(raw.clone()).map_err(|e| anyhow!(e))?)
        }
    };

    Ok(User {
        username,
        list_membership,
    })
}
