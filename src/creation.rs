//! Creation wizard handlers.
//!
//! [`CreationFlow`] wires a [`FlowController`] and an [`EntityService`] to
//! the `create` domain:
//!
//! | Pattern             | Routing key                         | Effect                         |
//! |---------------------|-------------------------------------|--------------------------------|
//! | `cmd:create`        | -                                   | start or resume the draft      |
//! | `component:select`  | `create:select:<entity>:<step>`     | apply the selected values      |
//! | `component:preview` | `create:preview:<entity>:<step>`    | show the projected draft       |
//! | `component:back`    | `create:back:<entity>`              | re-render the current step     |
//! | `component:finish`  | `create:finish:<entity>`            | finalize a complete draft      |
//! | `modal:name`        | `create:name:<entity>:<step>`       | apply a free-text value        |
//!
//! Every handler re-fetches the draft and checks ownership before touching
//! it. Nothing about the wizard position is carried in the routing key
//! besides the step type the user was looking at, which is how stale
//! submissions are detected.

use std::sync::Arc;

use crate::codec::RoutingKey;
use crate::error::{DispatchError, Result};
use crate::flow::{ensure_owner, CreationStep, DraftEntity, EntityService, FlowController, StepResult, StepType};
use crate::handler::{HandlerOutcome, InteractionContext, Router};
use crate::interaction::{HandlerResult, InteractionKind, InteractiveElement, Response};

/// Domain owned by the creation router.
pub const CREATE_DOMAIN: &str = "create";

/// Form field carrying a free-text step value.
pub const TEXT_FIELD: &str = "value";

const SELECT_ACTION: &str = "select";
const PREVIEW_ACTION: &str = "preview";
const BACK_ACTION: &str = "back";
const FINISH_ACTION: &str = "finish";
const TEXT_ACTION: &str = "name";

/// Creation wizard bound to an entity store.
pub struct CreationFlow<E: DraftEntity> {
    controller: Arc<FlowController<E>>,
    entities: Arc<dyn EntityService<E>>,
}

impl<E: DraftEntity> CreationFlow<E> {
    pub fn new(controller: Arc<FlowController<E>>, entities: Arc<dyn EntityService<E>>) -> Self {
        Self { controller, entities }
    }

    pub fn controller(&self) -> &Arc<FlowController<E>> {
        &self.controller
    }

    /// Build the `create` router.
    pub fn router(self: Arc<Self>) -> Router {
        let start = self.clone();
        let select = self.clone();
        let preview = self.clone();
        let back = self.clone();
        let finish = self.clone();
        let text = self;

        Router::new(CREATE_DOMAIN)
            .command(move |ctx| {
                let flow = start.clone();
                async move { flow.start(ctx).await }
            })
            .component(SELECT_ACTION, move |ctx| {
                let flow = select.clone();
                async move { flow.select(ctx).await }
            })
            .component(PREVIEW_ACTION, move |ctx| {
                let flow = preview.clone();
                async move { flow.preview(ctx).await }
            })
            .component(BACK_ACTION, move |ctx| {
                let flow = back.clone();
                async move { flow.back(ctx).await }
            })
            .component(FINISH_ACTION, move |ctx| {
                let flow = finish.clone();
                async move { flow.finish(ctx).await }
            })
            .modal(TEXT_ACTION, move |ctx| {
                let flow = text.clone();
                async move { flow.submit_text(ctx).await }
            })
    }

    /// Start or resume the requester's draft in the current scope.
    pub async fn start(&self, ctx: InteractionContext) -> HandlerOutcome {
        let interaction = ctx.interaction();
        let entity = self
            .entities
            .get_or_create_draft(&interaction.user_id, &interaction.scope_id)
            .await?;
        ensure_owner(&entity, ctx.user_id())?;

        let step = self.controller.current_step(&entity)?;
        tracing::info!(
            entity_id = %entity.id(),
            step_type = %step.step_type,
            "Creation started"
        );
        Ok(HandlerResult::respond(self.render(&entity, &step)?.as_ephemeral()))
    }

    /// Apply the selected values to the step named in the routing key.
    pub async fn select(&self, ctx: InteractionContext) -> HandlerOutcome {
        let (entity_id, step_type) = step_target(&ctx)?;
        let selections = component_values(&ctx);
        self.advance(&ctx, &entity_id, StepResult::new(step_type, selections)).await
    }

    /// Apply a free-text value submitted through a form.
    pub async fn submit_text(&self, ctx: InteractionContext) -> HandlerOutcome {
        let (entity_id, step_type) = step_target(&ctx)?;
        let value = match &ctx.interaction().kind {
            InteractionKind::Modal { fields, .. } => fields.get(TEXT_FIELD).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        self.advance(&ctx, &entity_id, StepResult::single(step_type, value.trim()))
            .await
    }

    /// Show what the draft would look like with the selection applied.
    pub async fn preview(&self, ctx: InteractionContext) -> HandlerOutcome {
        let (entity_id, step_type) = step_target(&ctx)?;
        let result = StepResult::new(step_type, component_values(&ctx));

        let entity = self.owned_entity(&ctx, &entity_id).await?;
        let projected = self.controller.preview_step_result(&entity, &result)?;
        Ok(HandlerResult::respond(Response::ephemeral(format!(
            "Preview: {}",
            projected.summary()
        ))))
    }

    /// Re-render the current step.
    pub async fn back(&self, ctx: InteractionContext) -> HandlerOutcome {
        let entity_id = entity_target(&ctx)?;
        let entity = self.owned_entity(&ctx, &entity_id).await?;
        let step = self.controller.back(&entity)?;
        Ok(HandlerResult::respond(self.render(&entity, &step)?.in_place()))
    }

    /// Finalize a draft whose steps are all done.
    pub async fn finish(&self, ctx: InteractionContext) -> HandlerOutcome {
        let entity_id = entity_target(&ctx)?;
        let entity = self.owned_entity(&ctx, &entity_id).await?;
        if entity.is_final() {
            return Err(DispatchError::validation("This character is already finished."));
        }
        if !self.controller.is_creation_complete(&entity) {
            return Err(DispatchError::validation(
                "There are still steps left. Complete them before finishing.",
            ));
        }

        let finalized = self.entities.finalize_draft(entity.id()).await?;
        tracing::info!(entity_id = %finalized.id(), "Creation finished");
        Ok(HandlerResult::respond(
            Response::text(format!("{} is ready!", finalized.summary())).in_place(),
        ))
    }

    /// Render a step as a response with interactive elements.
    pub fn render(&self, entity: &E, step: &CreationStep) -> Result<Response> {
        let mut text = format!("**{}**", step.title);
        if !step.description.is_empty() {
            text.push('\n');
            text.push_str(&step.description);
        }
        text.push_str("\n\n");
        text.push_str(&entity.summary());

        let mut response = Response::text(text).with_rich_content(serde_json::to_value(step)?);

        if step.step_type.is_complete() {
            let finish = RoutingKey::new(CREATE_DOMAIN, FINISH_ACTION).target(entity.id());
            return Ok(response.with_element(InteractiveElement::button(finish.encode()?, "Finish")));
        }

        if step.is_free_text() {
            let key = step_key(TEXT_ACTION, entity, &step.step_type);
            response = response.with_element(InteractiveElement::text_input(key.encode()?, &step.title));
        } else {
            let options: Vec<(String, String)> = step
                .options
                .iter()
                .map(|o| (o.key.clone(), o.name.clone()))
                .collect();
            let select = step_key(SELECT_ACTION, entity, &step.step_type);
            response = response.with_element(InteractiveElement::select(
                select.encode()?,
                &step.title,
                options.clone(),
                step.min_choices as u32,
                step.max_choices as u32,
            ));
            let preview = step_key(PREVIEW_ACTION, entity, &step.step_type);
            response = response.with_element(InteractiveElement::select(
                preview.encode()?,
                "Preview a choice",
                options,
                1,
                1,
            ));
        }

        let back = RoutingKey::new(CREATE_DOMAIN, BACK_ACTION).target(entity.id());
        Ok(response.with_element(InteractiveElement::button(back.encode()?, "Back")))
    }

    async fn advance(&self, ctx: &InteractionContext, entity_id: &str, result: StepResult) -> HandlerOutcome {
        let mut entity = self.owned_entity(ctx, entity_id).await?;
        let next = self.controller.process_step_result(&mut entity, &result)?;
        let stored = self.entities.update_entity(&entity).await?;
        Ok(HandlerResult::respond(self.render(&stored, &next)?.in_place()))
    }

    async fn owned_entity(&self, ctx: &InteractionContext, entity_id: &str) -> Result<E> {
        let entity = self.entities.get_entity(entity_id).await?;
        ensure_owner(&entity, ctx.user_id())?;
        Ok(entity)
    }
}

fn step_key<E: DraftEntity>(action: &str, entity: &E, step_type: &StepType) -> RoutingKey {
    RoutingKey::new(CREATE_DOMAIN, action)
        .target(entity.id())
        .arg(step_type.as_str())
}

fn entity_target(ctx: &InteractionContext) -> Result<String> {
    ctx.routing_key()
        .and_then(|key| key.target.clone())
        .ok_or_else(|| DispatchError::validation("This button is missing its character."))
}

fn step_target(ctx: &InteractionContext) -> Result<(String, StepType)> {
    let entity_id = entity_target(ctx)?;
    let step_type = ctx
        .routing_key()
        .and_then(|key| key.arg_at(0))
        .map(StepType::new)
        .ok_or_else(|| DispatchError::validation("This control is missing its step."))?;
    Ok((entity_id, step_type))
}

fn component_values(ctx: &InteractionContext) -> Vec<String> {
    match &ctx.interaction().kind {
        InteractionKind::Component { values, .. } => values.clone(),
        _ => Vec::new(),
    }
}
