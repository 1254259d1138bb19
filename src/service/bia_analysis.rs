//! Business impact analysis over the process/asset dependency graph.
//!
//! Edges point from a dependent process to whatever it needs to run: another
//! process or an asset. A process cannot be restored faster than the slowest
//! thing it (transitively) depends on, so every upstream RTO larger than the
//! process RTO is a gap, and the downtime cost is aggregated over the
//! achievable recovery time rather than the target.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::error::NexusError;
use crate::service::risk_scoring::RiskLevel;
use crate::types::bia::{AssetType, Criticality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Process(i64),
    Asset(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    pub id: i64,
    pub name: String,
    pub criticality: Criticality,
    pub rto_hours: f64,
    pub rpo_hours: f64,
    pub mtpd_hours: Option<f64>,
    pub hourly_downtime_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetNode {
    pub id: i64,
    pub name: String,
    pub asset_type: AssetType,
    pub rto_hours: Option<f64>,
    pub rpo_hours: Option<f64>,
    pub hourly_cost: f64,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    processes: BTreeMap<i64, ProcessNode>,
    assets: BTreeMap<i64, AssetNode>,
    /// process -> what it depends on, in insertion order
    upstream: HashMap<i64, Vec<NodeRef>>,
    /// node -> processes that depend on it
    downstream: HashMap<NodeRef, Vec<i64>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&mut self, node: ProcessNode) {
        self.processes.insert(node.id, node);
    }

    pub fn add_asset(&mut self, node: AssetNode) {
        self.assets.insert(node.id, node);
    }

    pub fn add_dependency(&mut self, process_id: i64, target: NodeRef) {
        self.upstream.entry(process_id).or_default().push(target);
        self.downstream.entry(target).or_default().push(process_id);
    }

    pub fn process(&self, id: i64) -> Option<&ProcessNode> {
        self.processes.get(&id)
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    fn upstream_of(&self, process_id: i64) -> &[NodeRef] {
        self.upstream.get(&process_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn downstream_of(&self, node: NodeRef) -> &[i64] {
        self.downstream.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn resolve(&self, node: NodeRef) -> Option<Resolved<'_>> {
        match node {
            NodeRef::Process(id) => self.processes.get(&id).map(Resolved::Process),
            NodeRef::Asset(id) => self.assets.get(&id).map(Resolved::Asset),
        }
    }
}

#[derive(Clone, Copy)]
enum Resolved<'a> {
    Process(&'a ProcessNode),
    Asset(&'a AssetNode),
}

impl Resolved<'_> {
    fn name(&self) -> &str {
        match self {
            Resolved::Process(p) => &p.name,
            Resolved::Asset(a) => &a.name,
        }
    }

    fn rto_hours(&self) -> Option<f64> {
        match self {
            Resolved::Process(p) => Some(p.rto_hours),
            Resolved::Asset(a) => a.rto_hours,
        }
    }

    fn rpo_hours(&self) -> Option<f64> {
        match self {
            Resolved::Process(p) => Some(p.rpo_hours),
            Resolved::Asset(a) => a.rpo_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachedDependency {
    pub node: NodeRef,
    pub name: String,
    /// 1 for a direct dependency.
    pub depth: usize,
    pub via_process_id: i64,
    pub rto_hours: Option<f64>,
    pub rpo_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveGap {
    pub node: NodeRef,
    pub name: String,
    pub target_hours: f64,
    pub dependency_hours: f64,
    pub gap_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactedProcess {
    pub process_id: i64,
    pub name: String,
    pub depth: usize,
    pub criticality: Criticality,
    pub hourly_downtime_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DowntimeCost {
    pub cost_at_target: f64,
    pub cost_at_achievable: f64,
    pub gap_cost: f64,
    pub propagated_cost: f64,
    pub asset_cost: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessAnalysis {
    pub process_id: i64,
    pub process_name: String,
    pub criticality: Criticality,
    pub rto_hours: f64,
    pub rpo_hours: f64,
    pub mtpd_hours: Option<f64>,
    pub achievable_rto_hours: f64,
    pub exceeds_mtpd: bool,
    pub dependencies: Vec<ReachedDependency>,
    pub rto_gaps: Vec<ObjectiveGap>,
    pub rpo_gaps: Vec<ObjectiveGap>,
    /// Dependencies without a recovery objective to compare against.
    pub missing_objectives: Vec<NodeRef>,
    pub impacted_processes: Vec<ImpactedProcess>,
    /// Edges whose target no longer exists.
    pub unresolved: Vec<NodeRef>,
    pub downtime_cost: DowntimeCost,
    pub risk_rating: RiskLevel,
}

fn gap(node: NodeRef, name: &str, target: f64, dependency: Option<f64>) -> Option<ObjectiveGap> {
    let dependency = dependency?;
    (dependency > target).then(|| ObjectiveGap {
        node,
        name: name.to_string(),
        target_hours: target,
        dependency_hours: dependency,
        gap_hours: dependency - target,
    })
}

pub fn analyze_process(
    graph: &DependencyGraph,
    process_id: i64,
) -> Result<ProcessAnalysis, NexusError> {
    let root = graph
        .process(process_id)
        .ok_or_else(|| NexusError::not_found("business process", process_id))?;

    let mut dependencies = Vec::new();
    let mut rto_gaps = Vec::new();
    let mut rpo_gaps = Vec::new();
    let mut missing_objectives = Vec::new();
    let mut unresolved = Vec::new();
    let mut asset_hourly_cost = 0.0;

    // upstream: everything the root needs
    let mut seen: HashSet<NodeRef> = HashSet::from([NodeRef::Process(root.id)]);
    let mut queue: VecDeque<(i64, usize)> = VecDeque::from([(root.id, 0)]);
    while let Some((current, depth)) = queue.pop_front() {
        for &target in graph.upstream_of(current) {
            if !seen.insert(target) {
                continue;
            }
            let Some(resolved) = graph.resolve(target) else {
                warn!(process_id = current, ?target, "dependency points at a missing node");
                unresolved.push(target);
                continue;
            };

            let rto = resolved.rto_hours();
            let rpo = resolved.rpo_hours();
            if rto.is_none() || rpo.is_none() {
                missing_objectives.push(target);
            }
            rto_gaps.extend(gap(target, resolved.name(), root.rto_hours, rto));
            rpo_gaps.extend(gap(target, resolved.name(), root.rpo_hours, rpo));

            match resolved {
                Resolved::Process(p) => queue.push_back((p.id, depth + 1)),
                Resolved::Asset(a) => asset_hourly_cost += a.hourly_cost,
            }

            dependencies.push(ReachedDependency {
                node: target,
                name: resolved.name().to_string(),
                depth: depth + 1,
                via_process_id: current,
                rto_hours: rto,
                rpo_hours: rpo,
            });
        }
    }

    let achievable_rto_hours = dependencies
        .iter()
        .filter_map(|d| d.rto_hours)
        .fold(root.rto_hours, f64::max);

    // downstream: everything that stops when the root stops
    let mut impacted_processes = Vec::new();
    let mut seen: HashSet<i64> = HashSet::from([root.id]);
    let mut queue: VecDeque<(i64, usize)> = VecDeque::from([(root.id, 0)]);
    while let Some((current, depth)) = queue.pop_front() {
        for &dependent in graph.downstream_of(NodeRef::Process(current)) {
            if !seen.insert(dependent) {
                continue;
            }
            let Some(p) = graph.process(dependent) else {
                continue;
            };
            impacted_processes.push(ImpactedProcess {
                process_id: p.id,
                name: p.name.clone(),
                depth: depth + 1,
                criticality: p.criticality,
                hourly_downtime_cost: p.hourly_downtime_cost,
            });
            queue.push_back((p.id, depth + 1));
        }
    }

    let cost_at_target = root.hourly_downtime_cost * root.rto_hours;
    let cost_at_achievable = root.hourly_downtime_cost * achievable_rto_hours;
    let propagated_cost = impacted_processes
        .iter()
        .map(|p| p.hourly_downtime_cost * achievable_rto_hours)
        .sum::<f64>();
    let asset_cost = asset_hourly_cost * achievable_rto_hours;
    let downtime_cost = DowntimeCost {
        cost_at_target,
        cost_at_achievable,
        gap_cost: cost_at_achievable - cost_at_target,
        propagated_cost,
        asset_cost,
        total: cost_at_achievable + propagated_cost + asset_cost,
    };

    let exceeds_mtpd = root
        .mtpd_hours
        .is_some_and(|mtpd| achievable_rto_hours > mtpd);

    let mut rank = root.criticality.rank();
    if !rto_gaps.is_empty() {
        rank += 1;
    }
    if exceeds_mtpd {
        rank += 1;
    }

    debug!(
        process_id = root.id,
        dependencies = dependencies.len(),
        rto_gaps = rto_gaps.len(),
        impacted = impacted_processes.len(),
        achievable_rto_hours,
        "process analysed"
    );

    Ok(ProcessAnalysis {
        process_id: root.id,
        process_name: root.name.clone(),
        criticality: root.criticality,
        rto_hours: root.rto_hours,
        rpo_hours: root.rpo_hours,
        mtpd_hours: root.mtpd_hours,
        achievable_rto_hours,
        exceeds_mtpd,
        dependencies,
        rto_gaps,
        rpo_gaps,
        missing_objectives,
        impacted_processes,
        unresolved,
        downtime_cost,
        risk_rating: RiskLevel::from_rank(rank),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub process_id: i64,
    pub name: String,
    pub criticality: Criticality,
    pub achievable_rto_hours: f64,
    pub rto_gap_count: usize,
    pub rpo_gap_count: usize,
    pub exceeds_mtpd: bool,
    pub total_downtime_cost: f64,
    pub risk_rating: RiskLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BiaOverview {
    pub processes: usize,
    pub processes_with_rto_gaps: usize,
    pub processes_exceeding_mtpd: usize,
    /// Sum of each process's own cost over its achievable RTO; propagated
    /// costs are left out so shared dependents are not counted twice.
    pub total_exposure: f64,
    pub summaries: Vec<ProcessSummary>,
}

/// Analyses every process, most expensive outage first.
pub fn analyze_all(graph: &DependencyGraph) -> BiaOverview {
    let mut overview = BiaOverview::default();
    for &id in graph.processes.keys() {
        let Ok(analysis) = analyze_process(graph, id) else {
            continue;
        };
        overview.processes += 1;
        if !analysis.rto_gaps.is_empty() {
            overview.processes_with_rto_gaps += 1;
        }
        if analysis.exceeds_mtpd {
            overview.processes_exceeding_mtpd += 1;
        }
        overview.total_exposure += analysis.downtime_cost.cost_at_achievable;
        overview.summaries.push(ProcessSummary {
            process_id: analysis.process_id,
            name: analysis.process_name,
            criticality: analysis.criticality,
            achievable_rto_hours: analysis.achievable_rto_hours,
            rto_gap_count: analysis.rto_gaps.len(),
            rpo_gap_count: analysis.rpo_gaps.len(),
            exceeds_mtpd: analysis.exceeds_mtpd,
            total_downtime_cost: analysis.downtime_cost.total,
            risk_rating: analysis.risk_rating,
        });
    }
    overview.summaries.sort_by(|a, b| {
        b.total_downtime_cost
            .total_cmp(&a.total_downtime_cost)
            .then_with(|| a.process_id.cmp(&b.process_id))
    });
    overview
}
