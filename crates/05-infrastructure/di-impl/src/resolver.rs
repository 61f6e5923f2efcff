//! 依赖图解析器
//!
//! 把每个注入点绑定到唯一的提供组件，然后在组件图上求强连通分量：
//! 第一遍三色深度优先遍历得到完成顺序，第二遍在转置图上收集分量。
//! 分量内出现构造器边即为非法循环。

use di_abstractions::{
    Binding, ConstructionGroup, ContainerConfig, DeclarationSet, DependencyResolver, InjectionKind,
    InjectionPoint, InjectionPointIndex, ManagedComponentDeclaration, ResolutionEdge,
    ResolutionPlan,
};
use infrastructure_common::{ComponentId, DependencyError, DependencyResult};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// 依赖图解析器
#[derive(Debug, Clone, Copy)]
pub struct GraphResolver {
    allow_deferred_cycles: bool,
}

impl GraphResolver {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self {
            allow_deferred_cycles: true,
        }
    }

    /// 从容器配置创建解析器
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self {
            allow_deferred_cycles: config.allow_deferred_cycles,
        }
    }

    /// 设置是否允许仅由延迟注入构成的循环
    #[must_use]
    pub fn with_deferred_cycles(mut self, allow: bool) -> Self {
        self.allow_deferred_cycles = allow;
        self
    }
}

impl Default for GraphResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyResolver for GraphResolver {
    fn resolve(
        &self,
        index: &InjectionPointIndex,
        declarations: &DeclarationSet,
    ) -> DependencyResult<ResolutionPlan> {
        let graph = ComponentGraph::build(index, declarations)?;
        let components = graph.strongly_connected_components();

        let mut groups = Vec::with_capacity(components.len());
        // 第二遍得到的分量从被依赖最少的开始，反转后依赖优先
        for members in components.into_iter().rev() {
            let cyclic = members.len() > 1 || graph.has_self_edge(members[0]);
            if cyclic {
                graph.check_cycle(&members, self.allow_deferred_cycles)?;
                debug!(
                    members = ?members.iter().map(|node| graph.name(*node)).collect::<Vec<_>>(),
                    "延迟注入循环已接受"
                );
            }
            groups.push(ConstructionGroup {
                members: members.iter().map(|node| graph.ids[*node]).collect(),
                cyclic,
            });
        }

        let plan = ResolutionPlan::new(graph.bindings, graph.edges, groups);
        info!(
            components = graph.ids.len(),
            bindings = plan.binding_count(),
            edges = plan.edges().len(),
            groups = plan.groups().len(),
            cyclic_groups = plan.cyclic_group_count(),
            "依赖解析完成"
        );
        Ok(plan)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// 组件图，节点按声明顺序编号
struct ComponentGraph<'a> {
    declarations: Vec<&'a ManagedComponentDeclaration>,
    ids: Vec<ComponentId>,
    adjacency: Vec<Vec<(usize, InjectionKind)>>,
    bindings: HashMap<(ComponentId, String), Binding>,
    edges: Vec<ResolutionEdge>,
}

impl<'a> ComponentGraph<'a> {
    fn build(
        index: &InjectionPointIndex,
        declarations: &'a DeclarationSet,
    ) -> DependencyResult<Self> {
        let nodes: Vec<&ManagedComponentDeclaration> = declarations.iter().collect();
        let ids: Vec<ComponentId> = nodes.iter().map(|decl| decl.id()).collect();
        let position: HashMap<ComponentId, usize> = ids
            .iter()
            .enumerate()
            .map(|(node, id)| (*id, node))
            .collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut bindings = HashMap::new();
        let mut edges = Vec::new();

        for (from, declaration) in nodes.iter().enumerate() {
            for point in index.get(&declaration.id()) {
                let provider = match_provider(point, declaration, &nodes)?;
                let to = position[&provider.id()];

                debug!(
                    component = %declaration.id(),
                    member = %point.member,
                    provider = %provider.id(),
                    kind = %point.kind,
                    "注入点已绑定"
                );

                bindings.insert(
                    (declaration.id(), point.member.clone()),
                    Binding {
                        provider: provider.id(),
                        capability: point.required_type,
                    },
                );
                edges.push(ResolutionEdge {
                    from: declaration.id(),
                    to: provider.id(),
                    member: point.member.clone(),
                    kind: point.kind,
                });
                adjacency[from].push((to, point.kind));
            }
        }

        Ok(Self {
            declarations: nodes,
            ids,
            adjacency,
            bindings,
            edges,
        })
    }

    fn name(&self, node: usize) -> &str {
        self.declarations[node].name()
    }

    fn has_self_edge(&self, node: usize) -> bool {
        self.adjacency[node].iter().any(|(to, _)| *to == node)
    }

    /// 三色深度优先遍历，返回完成顺序
    fn finishing_order(&self) -> Vec<usize> {
        let mut marks = vec![Mark::Unvisited; self.ids.len()];
        let mut order = Vec::with_capacity(self.ids.len());

        for root in 0..self.ids.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack = vec![(root, 0_usize)];

            loop {
                let Some(frame) = stack.last_mut() else {
                    break;
                };
                let node = frame.0;
                if let Some(&(child, _)) = self.adjacency[node].get(frame.1) {
                    frame.1 += 1;
                    match marks[child] {
                        Mark::Unvisited => {
                            marks[child] = Mark::InProgress;
                            stack.push((child, 0));
                        }
                        Mark::InProgress => {
                            debug!(from = self.name(node), to = self.name(child), "发现回边");
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    order.push(node);
                    stack.pop();
                }
            }
        }

        order
    }

    /// 强连通分量，按转置图上的发现顺序排列
    fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let order = self.finishing_order();

        let mut transposed = vec![Vec::new(); self.ids.len()];
        for (from, targets) in self.adjacency.iter().enumerate() {
            for (to, _) in targets {
                transposed[*to].push(from);
            }
        }

        let mut assigned = vec![false; self.ids.len()];
        let mut components = Vec::new();

        for &root in order.iter().rev() {
            if assigned[root] {
                continue;
            }
            assigned[root] = true;
            let mut members = Vec::new();
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                members.push(node);
                for &previous in &transposed[node] {
                    if !assigned[previous] {
                        assigned[previous] = true;
                        stack.push(previous);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        components
    }

    /// 检查环分量是否合法
    fn check_cycle(&self, members: &[usize], allow_deferred_cycles: bool) -> DependencyResult<()> {
        let constructor_edge = members.iter().find_map(|from| {
            self.adjacency[*from]
                .iter()
                .find(|(to, kind)| *kind == InjectionKind::Constructor && members.contains(to))
                .map(|(to, _)| (*from, *to))
        });

        if let Some((from, to)) = constructor_edge {
            return Err(DependencyError::circular(self.cycle_chain(from, to, members)));
        }

        if !allow_deferred_cycles {
            let from = members[0];
            let to = self.adjacency[from]
                .iter()
                .map(|(to, _)| *to)
                .find(|to| members.contains(to))
                .unwrap_or(from);
            return Err(DependencyError::circular(self.cycle_chain(from, to, members)));
        }

        Ok(())
    }

    /// 经过边 from -> to 的环上的组件名称链
    fn cycle_chain(&self, from: usize, to: usize, members: &[usize]) -> Vec<String> {
        let mut chain = vec![self.name(from).to_string()];
        if from == to {
            chain.push(self.name(to).to_string());
            return chain;
        }

        // 在分量内从 to 广度优先找回 from
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::from([to]);
        parent.insert(to, to);
        while let Some(node) = queue.pop_front() {
            if node == from {
                break;
            }
            for (next, _) in &self.adjacency[node] {
                if members.contains(next) && !parent.contains_key(next) {
                    parent.insert(*next, node);
                    queue.push_back(*next);
                }
            }
        }

        let mut path = vec![from];
        let mut node = from;
        while node != to {
            match parent.get(&node) {
                Some(previous) => {
                    node = *previous;
                    path.push(node);
                }
                None => break,
            }
        }
        chain.extend(path.iter().rev().map(|node| self.name(*node).to_string()));
        chain
    }
}

fn match_provider<'a>(
    point: &InjectionPoint,
    owner: &ManagedComponentDeclaration,
    candidates: &[&'a ManagedComponentDeclaration],
) -> DependencyResult<&'a ManagedComponentDeclaration> {
    let matches: Vec<&'a ManagedComponentDeclaration> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.provides(&point.required_type))
        .filter(|candidate| {
            point
                .qualifier
                .as_ref()
                .map_or(true, |qualifier| candidate.has_qualifier(qualifier))
        })
        .collect();

    match matches.as_slice() {
        [] => Err(DependencyError::UnsatisfiedDependency {
            component: owner.name().to_string(),
            injection_point: point.member.clone(),
            required_type: describe_required(point),
        }),
        [provider] => Ok(*provider),
        _ => Err(DependencyError::AmbiguousDependency {
            component: owner.name().to_string(),
            injection_point: point.member.clone(),
            required_type: describe_required(point),
            candidates: matches.iter().map(|decl| decl.name().to_string()).collect(),
        }),
    }
}

fn describe_required(point: &InjectionPoint) -> String {
    match &point.qualifier {
        Some(qualifier) => format!("{} {}", qualifier, point.required_type.name()),
        None => point.required_type.name().to_string(),
    }
}
