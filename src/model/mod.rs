//! Process models: the flow elements an execution walks through.
//!
//! Models are built with [`ProcessModelBuilder`] or read from JSON and are
//! validated before deployment.

pub mod builder;
pub mod condition;

use std::collections::{BTreeMap, HashSet};

use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use builder::ProcessModelBuilder;
pub use condition::{Condition, ConditionOperator};

use crate::core::{EngineError, Result, VariableValue};

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("identifier pattern is valid");
    static ref TIMER_DURATION: Regex = Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$")
        .expect("duration pattern is valid");
}

/// Parses `PT<h>H<m>M<s>S` durations (each part optional, at least one set).
pub fn parse_timer_duration(text: &str) -> Result<Duration> {
    let invalid = || EngineError::Model(format!("unsupported timer duration '{}'", text));
    let captures = TIMER_DURATION.captures(text).ok_or_else(invalid)?;
    if captures.iter().skip(1).all(|part| part.is_none()) {
        return Err(invalid());
    }
    let part = |index: usize| -> Result<i64> {
        captures
            .get(index)
            .map(|m| m.as_str().parse::<i64>().map_err(|_| invalid()))
            .unwrap_or(Ok(0))
    };
    Ok(Duration::hours(part(1)?) + Duration::minutes(part(2)?) + Duration::seconds(part(3)?))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementKind {
    StartEvent,
    EndEvent,
    UserTask {
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        candidate_users: Vec<String>,
        #[serde(default)]
        candidate_groups: Vec<String>,
    },
    /// Sets the given variables on the process instance. `fail_with` makes
    /// the task raise an execution error instead.
    ServiceTask {
        #[serde(default)]
        variables: BTreeMap<String, VariableValue>,
        #[serde(default)]
        fail_with: Option<String>,
    },
    ParallelGateway,
    ExclusiveGateway {
        #[serde(default)]
        default_flow: Option<String>,
    },
    ReceiveTask,
    IntermediateMessageCatch {
        message: String,
    },
    CallActivity {
        called_element: String,
    },
    BoundaryTimer {
        attached_to: String,
        duration: String,
        #[serde(default = "default_cancel_activity")]
        cancel_activity: bool,
    },
}

fn default_cancel_activity() -> bool {
    true
}

impl ElementKind {
    /// Activity type recorded on activity instances.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::StartEvent => "startEvent",
            Self::EndEvent => "endEvent",
            Self::UserTask { .. } => "userTask",
            Self::ServiceTask { .. } => "serviceTask",
            Self::ParallelGateway => "parallelGateway",
            Self::ExclusiveGateway { .. } => "exclusiveGateway",
            Self::ReceiveTask => "receiveTask",
            Self::IntermediateMessageCatch { .. } => "intermediateCatchEvent",
            Self::CallActivity { .. } => "callActivity",
            Self::BoundaryTimer { .. } => "boundaryEvent",
        }
    }

    /// Elements that stop the agenda until triggered from outside.
    pub fn is_wait_state(&self) -> bool {
        matches!(
            self,
            Self::UserTask { .. } | Self::ReceiveTask | Self::IntermediateMessageCatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowElement {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Continue asynchronously: entering the element only creates a job.
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(flatten)]
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceFlow {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessModel {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub elements: Vec<FlowElement>,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
}

impl ProcessModel {
    pub fn from_json(json: &str) -> Result<Self> {
        let model: ProcessModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn element(&self, id: &str) -> Option<&FlowElement> {
        self.elements.iter().find(|element| element.id == id)
    }

    pub fn element_or_err(&self, id: &str) -> Result<&FlowElement> {
        self.element(id).ok_or_else(|| {
            EngineError::Model(format!("process '{}' has no element '{}'", self.key, id))
        })
    }

    pub fn flow(&self, id: &str) -> Option<&SequenceFlow> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    pub fn outgoing(&self, element_id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|flow| flow.source == element_id).collect()
    }

    pub fn incoming(&self, element_id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|flow| flow.target == element_id).collect()
    }

    pub fn start_event(&self) -> Result<&FlowElement> {
        self.elements
            .iter()
            .find(|element| matches!(element.kind, ElementKind::StartEvent))
            .ok_or_else(|| EngineError::Model(format!("process '{}' has no start event", self.key)))
    }

    /// Boundary events attached to the given activity.
    pub fn boundary_events(&self, activity_id: &str) -> Vec<&FlowElement> {
        self.elements
            .iter()
            .filter(|element| {
                matches!(&element.kind, ElementKind::BoundaryTimer { attached_to, .. } if attached_to == activity_id)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(EngineError::Model(format!("process '{}': {}", self.key, message)));

        if !IDENTIFIER.is_match(&self.key) {
            return fail(format!("invalid process key '{}'", self.key));
        }

        let mut ids = HashSet::new();
        for element in &self.elements {
            if !IDENTIFIER.is_match(&element.id) {
                return fail(format!("invalid element id '{}'", element.id));
            }
            if !ids.insert(element.id.as_str()) {
                return fail(format!("duplicate id '{}'", element.id));
            }
        }
        for flow in &self.flows {
            if !IDENTIFIER.is_match(&flow.id) {
                return fail(format!("invalid flow id '{}'", flow.id));
            }
            if !ids.insert(flow.id.as_str()) {
                return fail(format!("duplicate id '{}'", flow.id));
            }
            for end in [&flow.source, &flow.target] {
                if self.element(end).is_none() {
                    return fail(format!("flow '{}' references unknown element '{}'", flow.id, end));
                }
            }
        }

        let starts = self
            .elements
            .iter()
            .filter(|element| matches!(element.kind, ElementKind::StartEvent))
            .count();
        if starts != 1 {
            return fail(format!("expected exactly one start event, found {}", starts));
        }

        for element in &self.elements {
            let incoming = self.incoming(&element.id);
            let outgoing = self.outgoing(&element.id);
            match &element.kind {
                ElementKind::StartEvent if !incoming.is_empty() => {
                    return fail(format!("start event '{}' has incoming flows", element.id));
                }
                ElementKind::EndEvent if !outgoing.is_empty() => {
                    return fail(format!("end event '{}' has outgoing flows", element.id));
                }
                ElementKind::ExclusiveGateway {
                    default_flow: Some(default_flow),
                } if !outgoing.iter().any(|flow| flow.id == *default_flow) => {
                    return fail(format!(
                        "default flow '{}' does not leave gateway '{}'",
                        default_flow, element.id
                    ));
                }
                ElementKind::BoundaryTimer {
                    attached_to,
                    duration,
                    ..
                } => {
                    parse_timer_duration(duration)?;
                    match self.element(attached_to) {
                        Some(host) if host.kind.is_wait_state() => {}
                        Some(_) => {
                            return fail(format!(
                                "boundary event '{}' must be attached to a wait state, not '{}'",
                                element.id, attached_to
                            ));
                        }
                        None => {
                            return fail(format!(
                                "boundary event '{}' is attached to unknown activity '{}'",
                                element.id, attached_to
                            ));
                        }
                    }
                    if !incoming.is_empty() {
                        return fail(format!("boundary event '{}' has incoming flows", element.id));
                    }
                }
                ElementKind::IntermediateMessageCatch { message } if message.trim().is_empty() => {
                    return fail(format!("message catch '{}' has no message name", element.id));
                }
                ElementKind::CallActivity { called_element } if called_element.trim().is_empty() => {
                    return fail(format!("call activity '{}' has no called element", element.id));
                }
                _ => {}
            }
            if !matches!(element.kind, ElementKind::StartEvent | ElementKind::BoundaryTimer { .. })
                && incoming.is_empty()
            {
                return fail(format!("element '{}' is unreachable", element.id));
            }
        }
        Ok(())
    }
}
