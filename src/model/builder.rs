use std::collections::BTreeMap;

use super::{Condition, ElementKind, FlowElement, ProcessModel, SequenceFlow};
use crate::core::{Result, VariableValue};

/// Fluent construction of a [`ProcessModel`]; `build` validates.
///
/// ```ignore
/// let model = ProcessModelBuilder::new("oneTask")
///     .start_event("start")
///     .user_task("review", Some("kermit"))
///     .end_event("end")
///     .flow("flow1", "start", "review")
///     .flow("flow2", "review", "end")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct ProcessModelBuilder {
    key: String,
    name: Option<String>,
    elements: Vec<FlowElement>,
    flows: Vec<(String, String, String, Option<String>)>,
    async_ids: Vec<String>,
}

impl ProcessModelBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn element(mut self, id: &str, kind: ElementKind) -> Self {
        self.elements.push(FlowElement {
            id: id.to_string(),
            name: None,
            is_async: false,
            kind,
        });
        self
    }

    pub fn start_event(self, id: &str) -> Self {
        self.element(id, ElementKind::StartEvent)
    }

    pub fn end_event(self, id: &str) -> Self {
        self.element(id, ElementKind::EndEvent)
    }

    pub fn user_task(self, id: &str, assignee: Option<&str>) -> Self {
        self.element(
            id,
            ElementKind::UserTask {
                assignee: assignee.map(str::to_string),
                candidate_users: Vec::new(),
                candidate_groups: Vec::new(),
            },
        )
    }

    pub fn candidate_user_task(self, id: &str, users: &[&str], groups: &[&str]) -> Self {
        self.element(
            id,
            ElementKind::UserTask {
                assignee: None,
                candidate_users: users.iter().map(|u| u.to_string()).collect(),
                candidate_groups: groups.iter().map(|g| g.to_string()).collect(),
            },
        )
    }

    pub fn service_task(self, id: &str, variables: &[(&str, VariableValue)]) -> Self {
        let variables: BTreeMap<String, VariableValue> = variables
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.element(
            id,
            ElementKind::ServiceTask {
                variables,
                fail_with: None,
            },
        )
    }

    /// A service task that always fails with the given message.
    pub fn failing_service_task(self, id: &str, message: &str) -> Self {
        self.element(
            id,
            ElementKind::ServiceTask {
                variables: BTreeMap::new(),
                fail_with: Some(message.to_string()),
            },
        )
    }

    pub fn parallel_gateway(self, id: &str) -> Self {
        self.element(id, ElementKind::ParallelGateway)
    }

    pub fn exclusive_gateway(self, id: &str, default_flow: Option<&str>) -> Self {
        self.element(
            id,
            ElementKind::ExclusiveGateway {
                default_flow: default_flow.map(str::to_string),
            },
        )
    }

    pub fn receive_task(self, id: &str) -> Self {
        self.element(id, ElementKind::ReceiveTask)
    }

    pub fn message_catch(self, id: &str, message: &str) -> Self {
        self.element(
            id,
            ElementKind::IntermediateMessageCatch {
                message: message.to_string(),
            },
        )
    }

    pub fn call_activity(self, id: &str, called_element: &str) -> Self {
        self.element(
            id,
            ElementKind::CallActivity {
                called_element: called_element.to_string(),
            },
        )
    }

    pub fn boundary_timer(self, id: &str, attached_to: &str, duration: &str) -> Self {
        self.element(
            id,
            ElementKind::BoundaryTimer {
                attached_to: attached_to.to_string(),
                duration: duration.to_string(),
                cancel_activity: true,
            },
        )
    }

    /// Marks an element as an asynchronous continuation.
    pub fn async_element(mut self, id: &str) -> Self {
        self.async_ids.push(id.to_string());
        self
    }

    pub fn flow(mut self, id: &str, source: &str, target: &str) -> Self {
        self.flows
            .push((id.to_string(), source.to_string(), target.to_string(), None));
        self
    }

    pub fn conditional_flow(mut self, id: &str, source: &str, target: &str, condition: &str) -> Self {
        self.flows.push((
            id.to_string(),
            source.to_string(),
            target.to_string(),
            Some(condition.to_string()),
        ));
        self
    }

    pub fn build(self) -> Result<ProcessModel> {
        let mut elements = self.elements;
        for element in elements.iter_mut() {
            element.is_async = self.async_ids.contains(&element.id);
        }
        let flows = self
            .flows
            .into_iter()
            .map(|(id, source, target, condition)| {
                Ok(SequenceFlow {
                    id,
                    source,
                    target,
                    condition: condition.as_deref().map(Condition::parse).transpose()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let model = ProcessModel {
            key: self.key,
            name: self.name,
            elements,
            flows,
        };
        model.validate()?;
        Ok(model)
    }
}
