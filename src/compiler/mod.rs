//! The squash driver: depth-first, queue-based graph compilation.
//!
//! Compilation seeds a double-ended queue with a recipe's root references -
//! declared files, expanded remote trees, membership-scanned documents - in
//! declaration order, then repeatedly pops the front. New edges are pushed
//! to the *front* of the queue, which implements depth-first expansion with
//! an explicit deque instead of recursion: no stack-depth risk on long
//! chains, and a dependency is fully emitted before the dependent that
//! required it.
//!
//! Emission is deferred: expanding a source enqueues its edges followed by
//! an emit marker for the source itself, so `a.md` requiring `b.md` yields
//! `[b-content, a-content]`. A visited set keyed by canonical key makes
//! revisits no-ops, which is also how cycles terminate - compiling a cyclic
//! graph is safe and each participant appears exactly once.
//!
//! Classification is computed once per resolved source from its reference
//! shape. Command files chain their edges like body files but are extracted
//! into their own output list. Skill files are self-contained leaf bundles:
//! their own `requires` are resolved by a separate nested compile whose
//! ordered body becomes the skill's published content, not chained into the
//! parent traversal. Script files are carried byte-for-byte and never
//! text-merged.

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use anyhow::Result;

use crate::core::{CanonicalKey, Category, SourceReference};
use crate::markdown;
use crate::recipe::Recipe;
use crate::resolver::{self, ResolvedSource};
use crate::source::{SourceResolver, scan_memberships};

/// The categorized result of one compile.
///
/// The four lists are disjoint by canonical key and preserve first-discovery
/// order. Compiling the same recipe twice over unchanged inputs yields an
/// identical `CompiledOutput`.
#[derive(Debug, Clone, Default)]
pub struct CompiledOutput {
    /// Sources merged into the single output document
    pub body: Vec<ResolvedSource>,
    /// Extracted command files
    pub commands: Vec<ResolvedSource>,
    /// Independently compiled skill bundles
    pub skills: Vec<ResolvedSource>,
    /// Executable scripts, copied byte-for-byte
    pub scripts: Vec<ResolvedSource>,
}

impl CompiledOutput {
    /// Render the merged output document from the body list.
    pub fn render(&self) -> String {
        let sections: Vec<&str> =
            self.body.iter().map(|source| source.body.trim_end()).collect();
        let mut document = sections.join("\n\n");
        if !document.is_empty() {
            document.push('\n');
        }
        document
    }

    /// Total number of sources across the four lists.
    pub fn len(&self) -> usize {
        self.body.len() + self.commands.len() + self.skills.len() + self.scripts.len()
    }

    /// Whether the compile produced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every resolved source across the four lists.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedSource> {
        self.body
            .iter()
            .chain(self.commands.iter())
            .chain(self.skills.iter())
            .chain(self.scripts.iter())
    }
}

/// Queue entries: expand a reference, or emit an already-resolved source.
///
/// The two-state shape is what defers emission until after a source's
/// dependencies have been expanded ahead of it.
enum WorkItem {
    Expand(SourceReference),
    Emit(Box<ResolvedSource>),
}

/// Depth-first graph compiler over a source resolver.
pub struct Compiler<'a> {
    resolver: &'a mut SourceResolver,
}

impl<'a> Compiler<'a> {
    /// Create a compiler borrowing the resolver for one or more runs.
    pub fn new(resolver: &'a mut SourceResolver) -> Self {
        Self {
            resolver,
        }
    }

    /// Compile a recipe into categorized output.
    ///
    /// Remote groups are batch-fetched up front; traversal itself is
    /// strictly sequential, so output order is deterministic for identical
    /// inputs.
    pub async fn compile(&mut self, recipe: &Recipe) -> Result<CompiledOutput> {
        self.resolver.prefetch(&recipe.sources).await;
        let roots = self.collect_roots(recipe).await;
        tracing::debug!("compiling recipe '{}' from {} roots", recipe.name, roots.len());

        let mut skill_stack = HashSet::new();
        self.run(roots, &mut skill_stack).await
    }

    /// Gather root references in declaration order: files, then remote
    /// sources (trees expanded), then membership-scanned documents.
    async fn collect_roots(&mut self, recipe: &Recipe) -> Vec<SourceReference> {
        let mut roots = Vec::new();

        for file in &recipe.files {
            roots.push(SourceReference::local(file, &recipe.name, crate::core::DiscoveryKind::Root));
        }

        for source in &recipe.sources {
            if source.is_tree() {
                match self.resolver.expand_tree(source, &recipe.name).await {
                    Ok(expanded) => roots.extend(expanded),
                    Err(e) => {
                        tracing::warn!("dropping tree {}:{}: {e}", source.repo, source.path);
                        eprintln!(
                            "Warning: failed to expand {}@{}:{}, dropping it: {e}",
                            source.repo, source.branch, source.path
                        );
                    }
                }
            } else {
                roots.push(SourceReference::remote(
                    source.repo.clone(),
                    source.branch.clone(),
                    source.path.clone(),
                    &recipe.name,
                    crate::core::DiscoveryKind::Root,
                ));
            }
        }

        roots.extend(scan_memberships(self.resolver.root(), &recipe.name));
        roots
    }

    /// The traversal loop. `skill_stack` carries the keys of skills whose
    /// nested compiles are in progress, so a skill inside its own bundle is
    /// treated as plain body and skill cycles cannot nest forever.
    async fn run(
        &mut self,
        roots: Vec<SourceReference>,
        skill_stack: &mut HashSet<CanonicalKey>,
    ) -> Result<CompiledOutput> {
        let mut output = CompiledOutput::default();
        let mut visited: HashSet<CanonicalKey> = HashSet::new();
        let mut queue: VecDeque<WorkItem> = roots.into_iter().map(WorkItem::Expand).collect();

        while let Some(item) = queue.pop_front() {
            match item {
                WorkItem::Emit(source) => {
                    let list = match source.category {
                        Category::Body => &mut output.body,
                        Category::Command => &mut output.commands,
                        Category::Skill => &mut output.skills,
                        Category::Script => &mut output.scripts,
                    };
                    list.push(*source);
                }
                WorkItem::Expand(reference) => {
                    let Some(source) = self.resolve_reference(&reference).await else {
                        continue;
                    };
                    if visited.contains(&source.key) {
                        // Idempotent skip: already expanded on this run.
                        // This is also how cycles terminate.
                        continue;
                    }
                    visited.insert(source.key.clone());
                    self.expand(source, &mut queue, &mut output, &mut visited, skill_stack)
                        .await?;
                }
            }
        }

        Ok(output)
    }

    /// Expand one freshly visited source: extract edges, handle skill
    /// nesting, and enqueue edges ahead of the source's own emit marker.
    async fn expand(
        &mut self,
        mut source: ResolvedSource,
        queue: &mut VecDeque<WorkItem>,
        output: &mut CompiledOutput,
        visited: &mut HashSet<CanonicalKey>,
        skill_stack: &mut HashSet<CanonicalKey>,
    ) -> Result<()> {
        let nested_as_body = source.category == Category::Skill && skill_stack.contains(&source.key);
        if nested_as_body {
            // Inside this skill's own nested compile the skill file is just
            // another body section.
            source.category = Category::Body;
        }

        let edges = match source.category {
            // Scripts carry no metadata and chain nothing.
            Category::Script => Vec::new(),
            Category::Skill => {
                self.compile_skill(&mut source, output, visited, skill_stack).await?;
                Vec::new()
            }
            Category::Body | Category::Command => resolver::extract_edges(&source),
        };

        // Front-insertion, declaration order preserved: the emit marker goes
        // in first so the edges land ahead of it.
        queue.push_front(WorkItem::Emit(Box::new(source)));
        for edge in edges.into_iter().rev() {
            queue.push_front(WorkItem::Expand(edge));
        }
        Ok(())
    }

    /// Compile a skill bundle with a separate nested pass rooted at the
    /// skill file. The nested body - dependencies first, the skill itself
    /// last - becomes the skill's published content. Side-artifacts found
    /// inside the bundle surface into the parent's lists, deduplicated
    /// against the parent's visited set.
    async fn compile_skill(
        &mut self,
        source: &mut ResolvedSource,
        output: &mut CompiledOutput,
        visited: &mut HashSet<CanonicalKey>,
        skill_stack: &mut HashSet<CanonicalKey>,
    ) -> Result<()> {
        tracing::debug!("nested skill compile for {}", source.key);
        skill_stack.insert(source.key.clone());
        let nested = self.run_nested(vec![source.reference.clone()], skill_stack).await?;
        skill_stack.remove(&source.key);

        source.body = nested.render();

        for found in nested.commands.into_iter().chain(nested.scripts).chain(nested.skills) {
            if visited.insert(found.key.clone()) {
                let list = match found.category {
                    Category::Command => &mut output.commands,
                    Category::Script => &mut output.scripts,
                    _ => &mut output.skills,
                };
                list.push(found);
            }
        }
        Ok(())
    }

    /// Boxed indirection for the recursive skill-bundle call; `run` awaits
    /// `expand`, which awaits `compile_skill`, which re-enters `run`.
    fn run_nested<'s>(
        &'s mut self,
        roots: Vec<SourceReference>,
        skill_stack: &'s mut HashSet<CanonicalKey>,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<CompiledOutput>> + 's>> {
        Box::pin(self.run(roots, skill_stack))
    }

    /// Resolve and classify a reference; `None` drops it with a warning.
    async fn resolve_reference(&mut self, reference: &SourceReference) -> Option<ResolvedSource> {
        let (raw, key) = match self.resolver.resolve(reference).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("dropping unresolvable reference {reference}: {e}");
                eprintln!("Warning: {e}, dropping it from the output");
                return None;
            }
        };

        let category = Category::classify(&reference.locator);
        let (metadata, body) = if category == Category::Script {
            // Byte-for-byte: no metadata split for executables.
            (Default::default(), raw.clone())
        } else {
            let display = reference.to_string();
            markdown::split_with_context(&raw, Some(display.as_str()))
        };

        Some(ResolvedSource {
            reference: reference.clone(),
            key,
            raw,
            body,
            metadata,
            category,
        })
    }
}
