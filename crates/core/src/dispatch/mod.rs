use crate::{
    graph::{StageGraph, Target},
    TriggerType,
};

/// Outcome of feeding one trigger to the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No stage, or the stage declares nothing for this trigger.
    Ignored,
    /// Enter the given stage. May equal the current stage.
    Enter(String),
    Terminate,
}

/// Resolves a trigger against the current stage's table, first match wins.
pub fn resolve(graph: &StageGraph, current: Option<&str>, trigger: TriggerType) -> Transition {
    let Some(current) = current else {
        tracing::debug!(%trigger, "trigger ignored, no stage entered");
        return Transition::Ignored;
    };
    let Some(stage) = graph.stage(current) else {
        tracing::debug!(%trigger, stage = current, "trigger ignored, stage not in graph");
        return Transition::Ignored;
    };

    match stage.trigger_for(trigger) {
        None => {
            tracing::debug!(%trigger, stage = current, "no matching trigger");
            Transition::Ignored
        }
        Some(matched) => match &matched.target {
            Target::Exit => Transition::Terminate,
            Target::Stage(next) => Transition::Enter(next.clone()),
        },
    }
}
