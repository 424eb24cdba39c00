use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::issue::{CustomerChoice, IssueType, ItemIssue};
use crate::models::message::SenderRole;
use crate::models::order::OrderStatus;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportIssue {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveIssue {
    pub choice: CustomerChoice,
}

pub fn report_item_unavailable(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    item_id: Uuid,
    req: ReportIssue,
) -> Result<ItemIssue, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if actor.role != Role::Driver || !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may flag items".to_string(),
        ));
    }
    if !matches!(
        order.status,
        OrderStatus::ArrivedAtStore | OrderStatus::Shopping
    ) {
        return Err(AppError::Conflict(
            "items can only be flagged while at the store".to_string(),
        ));
    }

    let item_name = order
        .item(item_id)
        .map(|item| item.name.clone())
        .ok_or_else(|| AppError::NotFound(format!("item {item_id} not found on this order")))?;

    let already_open = state
        .issues
        .iter()
        .any(|entry| entry.value().order_item_id == item_id && !entry.value().resolved);
    if already_open {
        return Err(AppError::Conflict(
            "item already has an open issue".to_string(),
        ));
    }

    let issue = ItemIssue {
        id: Uuid::new_v4(),
        order_id,
        order_item_id: item_id,
        issue_type: IssueType::Unavailable,
        driver_notes: req.notes,
        customer_choice: None,
        resolved: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    if let Some(item) = order.item_mut(item_id) {
        item.flagged_unavailable = true;
    }
    order.touch();

    // Inserted while the order guard is held so a duplicate report on the
    // same item cannot slip past the open-issue check.
    state.issues.insert(issue.id, issue.clone());
    drop(entry);

    state.metrics.open_issues.inc();
    notify::emit(
        state,
        OrderEvent::IssueRaised {
            order_id,
            issue_id: issue.id,
            order_item_id: item_id,
        },
    );
    notify::post_message(
        state,
        order_id,
        Some(actor.user_id),
        SenderRole::Driver,
        format!("Item unavailable: \"{item_name}\". Please choose a replacement or a refund."),
    );

    info!(order_id = %order_id, issue_id = %issue.id, "item flagged unavailable");
    Ok(issue)
}

pub fn resolve_issue(
    state: &AppState,
    actor: &Actor,
    issue_id: Uuid,
    req: ResolveIssue,
) -> Result<ItemIssue, AppError> {
    let (order_id, item_id) = {
        let issue = state
            .issues
            .get(&issue_id)
            .ok_or_else(|| AppError::NotFound(format!("issue {issue_id} not found")))?;
        (issue.order_id, issue.order_item_id)
    };

    let item_name = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if actor.role != Role::Customer || order.customer_id != actor.user_id {
            return Err(AppError::Unauthorized(
                "only the ordering customer may resolve this issue".to_string(),
            ));
        }
        order
            .item(item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| "item".to_string())
    };

    let resolved = {
        let mut issue = state
            .issues
            .get_mut(&issue_id)
            .ok_or_else(|| AppError::NotFound(format!("issue {issue_id} not found")))?;
        if issue.resolved {
            return Err(AppError::AlreadyResolved);
        }
        issue.customer_choice = Some(req.choice);
        issue.resolved = true;
        issue.updated_at = Utc::now();
        issue.clone()
    };

    state.metrics.open_issues.dec();
    notify::emit(
        state,
        OrderEvent::IssueResolved {
            order_id,
            issue_id,
            choice: req.choice,
        },
    );

    let body = match req.choice {
        CustomerChoice::Replacement => {
            format!("Replacement approved for \"{item_name}\". Please pick the closest match.")
        }
        CustomerChoice::Refund => {
            format!("Refund requested for \"{item_name}\". No replacement needed.")
        }
    };
    notify::post_message(state, order_id, Some(actor.user_id), SenderRole::Customer, body);

    info!(order_id = %order_id, issue_id = %issue_id, choice = ?req.choice, "issue resolved");
    Ok(resolved)
}

pub fn order_issues(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
) -> Result<Vec<ItemIssue>, AppError> {
    {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if !order.can_be_viewed_by(actor) {
            return Err(AppError::Unauthorized(
                "no access to this order".to_string(),
            ));
        }
    }

    let mut issues: Vec<ItemIssue> = state
        .issues
        .iter()
        .filter(|entry| entry.value().order_id == order_id)
        .map(|entry| entry.value().clone())
        .collect();

    issues.sort_by_key(|issue| issue.created_at);
    Ok(issues)
}
