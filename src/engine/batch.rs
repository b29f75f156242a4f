//! One `move_methods` call: validate, order, compute the moves in memory,
//! then write move by move.
//!
//! A request that fails validation writes nothing. Once the batch is under
//! way, a move that fails keeps the moves planned before it: those are
//! written and the failure comes back as [`RelocationError::PartialBatch`].

use super::report::{MoveReport, MovedMethod};
use super::{Engine, MoveMethodsRequest};
use crate::config::NamespaceStyle;
use crate::errors::{ErrorCode, RelocationError, Result};
use crate::io::{Encoding, TextFile};
use crate::relocation::{
    merge_into, new_file_unit, order, propagate_usings, relocate, BatchEntry, MergeStatus,
    MoveLedger, MoveOutcome, MoveRequest, NameResolver, OrderResult, RelocationContext,
    WorkspaceResolver,
};
use crate::syntax::{format_unit, CompilationUnit, FormatOptions};
use crate::workspace::{normalize_path, Document, UnitIndex, Workspace};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span, info, warn};

/// Source and target trees after one move, ready to be written.
struct PlannedMove {
    name: String,
    outcome: MoveOutcome,
    merge: MergeStatus,
    source: CompilationUnit,
    /// `None` when the target type lives in the source file.
    target: Option<CompilationUnit>,
}

/// The moves planned before one failed, and that failure.
struct Plan {
    moves: Vec<PlannedMove>,
    stopped: Option<Stopped>,
}

struct Stopped {
    method: String,
    cause: RelocationError,
    /// Batch entries after the failed one, never attempted.
    skipped: Vec<String>,
}

impl Stopped {
    /// Names of every entry this batch will not move.
    fn unmoved(&self) -> Vec<String> {
        std::iter::once(self.method.clone())
            .chain(self.skipped.iter().cloned())
            .collect()
    }
}

struct TargetFile {
    path: PathBuf,
    /// `None` when it is the source file.
    unit: Option<CompilationUnit>,
    encoding: Encoding,
    created: bool,
}

pub(super) fn run(engine: &mut Engine, request: &MoveMethodsRequest) -> Result<MoveReport> {
    let _span = debug_span!(
        "move_methods",
        source = %request.source_type,
        target = %request.target_type,
        methods = request.method_names.len()
    )
    .entered();

    let source_path = normalize_path(&request.file_path);
    check_names(request, &engine.session.ledger, &source_path)?;
    if request.source_type == request.target_type {
        return Err(RelocationError::precondition(
            ErrorCode::TARGET_CONFLICT,
            format!(
                "cannot move methods of '{}' into itself",
                request.source_type
            ),
        ));
    }

    let fs = engine.fs.clone();
    let workspace = &mut engine.session.workspace;
    let source = workspace.get_or_load(fs.as_ref(), &source_path)?;
    let entries = batch_entries(&source, request)?;
    let target = load_target(engine, request, &source)?;

    let workspace = &engine.session.workspace;
    let ordered = order_batch(workspace, &source, &entries);
    let plan = plan_moves(engine, request, &source, &target, &entries, &ordered)?;

    let cycle_edges = ordered
        .cycle_edges
        .iter()
        .map(|&(caller, callee)| (entries[caller].name().to_string(), entries[callee].name().to_string()))
        .collect();
    let unmoved = plan.stopped.as_ref().map(Stopped::unmoved).unwrap_or_default();
    let moved = write_moves(engine, &source, &target, &plan.moves, &unmoved)?;
    let planned = plan.moves;

    if let Some(stopped) = plan.stopped {
        warn!(
            method = %stopped.method,
            error = %stopped.cause,
            completed = moved.len(),
            "Batch stopped part way"
        );
        return Err(RelocationError::PartialBatch {
            completed: moved.into_iter().map(|m| m.name).collect(),
            failed: stopped.method,
            cause: Box::new(stopped.cause),
            skipped: stopped.skipped,
        });
    }

    Ok(MoveReport {
        source_file: source_path,
        target_file: target.path.clone(),
        source_type: request.source_type.clone(),
        target_type: request.target_type.clone(),
        order: planned.iter().map(|p| p.name.clone()).collect(),
        moved,
        cycle_edges,
        created_target_file: target.created,
    })
}

fn check_names(request: &MoveMethodsRequest, ledger: &MoveLedger, path: &Path) -> Result<()> {
    if request.method_names.is_empty() {
        return Err(RelocationError::precondition(
            ErrorCode::METHOD_NOT_FOUND,
            format!("no methods of '{}' were named to move", request.source_type),
        ));
    }
    let mut seen = BTreeSet::new();
    for name in &request.method_names {
        if !seen.insert(name.as_str()) {
            return Err(RelocationError::precondition(
                ErrorCode::DUPLICATE_IN_BATCH,
                format!("'{name}' is named more than once in the batch"),
            ));
        }
        if ledger.contains(path, name) {
            return Err(RelocationError::AlreadyMoved {
                method: name.clone(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn batch_entries(source: &Document, request: &MoveMethodsRequest) -> Result<Vec<BatchEntry>> {
    let unit = &source.unit;
    if unit.find_type(&request.source_type).is_none() {
        return Err(RelocationError::type_not_found(&request.source_type, &source.path));
    }
    request
        .method_names
        .iter()
        .map(|name| {
            let ty = unit
                .find_type_declaring(&request.source_type, name)
                .ok_or_else(|| RelocationError::method_not_found(name, &request.source_type, &source.path))?;
            let mut methods: Vec<_> = ty.methods_named(name).collect();
            if methods.len() > 1 {
                return Err(RelocationError::precondition(
                    ErrorCode::AMBIGUOUS_OVERLOAD,
                    format!(
                        "cannot move '{name}': '{}' declares {} overloads with that name",
                        request.source_type,
                        methods.len()
                    ),
                ));
            }
            let method = methods
                .pop()
                .ok_or_else(|| RelocationError::method_not_found(name, &request.source_type, &source.path))?;
            Ok(BatchEntry::new(request.source_type.clone(), method))
        })
        .collect()
}

/// Where the target type lives or will be created: the requested file, the
/// source file, the file declaring it, or `<Target>.cs` next to the source.
fn target_path(workspace: &Workspace, request: &MoveMethodsRequest, source: &Document) -> PathBuf {
    if let Some(path) = &request.target_file_path {
        return normalize_path(path);
    }
    if source.unit.find_type(&request.target_type).is_some() {
        return source.path.clone();
    }
    if let Some(path) = workspace.find_type_file(&request.target_type) {
        return path;
    }
    let dir = source.path.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(format!("{}.cs", request.target_type)))
}

fn load_target(engine: &mut Engine, request: &MoveMethodsRequest, source: &Document) -> Result<TargetFile> {
    let path = target_path(&engine.session.workspace, request, source);
    let target = if path == source.path {
        TargetFile {
            path,
            unit: None,
            encoding: source.encoding,
            created: false,
        }
    } else if engine.fs.exists(&path) {
        let document = engine.session.workspace.get_or_load(engine.fs.as_ref(), &path)?;
        TargetFile {
            path,
            unit: Some(document.unit),
            encoding: document.encoding,
            created: false,
        }
    } else {
        let namespace = source.unit.namespace_of(&request.source_type);
        let file_scoped = match engine.config.new_file_namespace_style {
            NamespaceStyle::Match => source
                .unit
                .first_namespace()
                .is_some_and(|ns| ns.is_file_scoped()),
            NamespaceStyle::Block => false,
            NamespaceStyle::FileScoped => true,
        };
        debug!(path = %path.display(), namespace = ?namespace, "Target file will be created");
        TargetFile {
            path,
            unit: Some(new_file_unit(namespace.as_deref(), file_scoped)?),
            encoding: source.encoding,
            created: true,
        }
    };

    let declared_here = target
        .unit
        .as_ref()
        .unwrap_or(&source.unit)
        .find_type(&request.target_type)
        .is_some();
    let elsewhere = engine
        .session
        .workspace
        .files_declaring(&request.target_type, &target.path);
    if !declared_here && !elsewhere.is_empty() {
        return Err(RelocationError::precondition(
            ErrorCode::TARGET_CONFLICT,
            format!(
                "'{}' is declared in {} but the target file is {}",
                request.target_type,
                elsewhere[0].display(),
                target.path.display()
            ),
        ));
    }
    Ok(target)
}

fn order_batch(workspace: &Workspace, source: &Document, entries: &[BatchEntry]) -> OrderResult {
    if !workspace.is_program_loaded() {
        return order(entries, &NameResolver);
    }
    let excluded = [source.path.clone()];
    let index = UnitIndex::new(std::iter::once(&source.unit).chain(workspace.units_except(&excluded)));
    let resolver = WorkspaceResolver::new(&index);
    order(entries, &resolver)
}

/// Runs the moves in order against the evolving in-memory trees. The first
/// failing move ends planning; it is returned as is when nothing was
/// planned before it.
fn plan_moves(
    engine: &Engine,
    request: &MoveMethodsRequest,
    source: &Document,
    target: &TargetFile,
    entries: &[BatchEntry],
    ordered: &OrderResult,
) -> Result<Plan> {
    let config = &engine.config;
    let source_text = source.unit.to_source();
    let source_options = config.format_options(&source_text);
    let mut planner = Planner {
        engine,
        request,
        source,
        indent: config.indent.unit_for(&source_text),
        target_options: match &target.unit {
            Some(unit) if !target.created => config.format_options(&unit.to_source()),
            _ => source_options.clone(),
        },
        source_options,
        excluded: [source.path.clone(), target.path.clone()],
        source_unit: source.unit.clone(),
        target_unit: target.unit.clone(),
    };

    let names: Vec<String> = ordered
        .order
        .iter()
        .map(|&index| entries[index].name().to_string())
        .collect();
    let mut moves = Vec::with_capacity(names.len());
    for (position, name) in names.iter().enumerate() {
        match planner.plan(name) {
            Ok(step) => moves.push(step),
            Err(cause) if moves.is_empty() => return Err(cause),
            Err(cause) => {
                debug!(method = %name, error = %cause, "Planning stopped");
                return Ok(Plan {
                    moves,
                    stopped: Some(Stopped {
                        method: name.clone(),
                        cause,
                        skipped: names[position + 1..].to_vec(),
                    }),
                });
            }
        }
    }
    Ok(Plan { moves, stopped: None })
}

/// The source and target trees as the batch rewrites them.
struct Planner<'a> {
    engine: &'a Engine,
    request: &'a MoveMethodsRequest,
    source: &'a Document,
    indent: String,
    source_options: FormatOptions,
    target_options: FormatOptions,
    excluded: [PathBuf; 2],
    source_unit: CompilationUnit,
    target_unit: Option<CompilationUnit>,
}

impl Planner<'_> {
    /// Computes one move. The trees only advance when it succeeds.
    fn plan(&mut self, name: &str) -> Result<PlannedMove> {
        let request = self.request;
        let move_request = move_request(self.engine, request, name);

        let outcome = {
            let target_decl = self
                .target_unit
                .as_ref()
                .unwrap_or(&self.source_unit)
                .find_type(&request.target_type);
            let types = UnitIndex::new(
                std::iter::once(&self.source_unit)
                    .chain(self.target_unit.as_ref())
                    .chain(self.engine.session.workspace.units_except(&self.excluded)),
            );
            let ctx = RelocationContext {
                unit: &self.source_unit,
                path: &self.source.path,
                index: &types,
                config: &self.engine.config,
                indent: &self.indent,
                target: target_decl.as_ref(),
            };
            relocate(&ctx, &move_request)?
        };

        let mut source_unit = replace_source(&self.source_unit, &outcome, &self.source.path)?;
        let (target_unit, merge) = match &self.target_unit {
            Some(unit) => {
                let (merged, status) = merge(unit, request, &outcome)?;
                let target_namespace = merged.namespace_of(&request.target_type);
                let merged = propagate_usings(
                    &source_unit,
                    &merged,
                    outcome.namespace.as_deref(),
                    target_namespace.as_deref(),
                )?;
                (Some(format_unit(&merged, &self.target_options)), status)
            }
            None => {
                let (merged, status) = merge(&source_unit, request, &outcome)?;
                source_unit = merged;
                (None, status)
            }
        };
        let source_unit = format_unit(&source_unit, &self.source_options);

        debug!(method = %name, merge = ?merge, "Move planned");
        self.source_unit = source_unit.clone();
        self.target_unit = target_unit.clone();
        Ok(PlannedMove {
            name: name.to_string(),
            outcome,
            merge,
            source: source_unit,
            target: target_unit,
        })
    }
}

fn move_request(engine: &Engine, request: &MoveMethodsRequest, method: &str) -> MoveRequest {
    MoveRequest::new(&request.source_type, method, &request.target_type)
        .with_constructor_injections(request.constructor_injections.iter().cloned())
        .with_parameter_injections(request.parameter_injections.iter().cloned())
        .with_access_member(
            request.access_member_name.clone(),
            request
                .access_member_kind
                .unwrap_or(engine.config.default_access_member_kind),
        )
}

fn replace_source(unit: &CompilationUnit, outcome: &MoveOutcome, path: &Path) -> Result<CompilationUnit> {
    unit.replace_type(&outcome.original_source, outcome.updated_source.clone())
        .ok_or_else(|| RelocationError::type_not_found(outcome.original_source.name(), path))
}

fn merge(
    unit: &CompilationUnit,
    request: &MoveMethodsRequest,
    outcome: &MoveOutcome,
) -> Result<(CompilationUnit, MergeStatus)> {
    merge_into(
        unit,
        &request.target_type,
        outcome.prepared_target.as_ref(),
        &outcome.moved_method,
        outcome.namespace.as_deref(),
    )
}

/// Writes each planned move, source first. The ledger and the document
/// cache only learn about a move once its writes succeeded. `unmoved` names
/// the entries planning never reached; they count as skipped if a write
/// stops the batch.
fn write_moves(
    engine: &mut Engine,
    source: &Document,
    target: &TargetFile,
    planned: &[PlannedMove],
    unmoved: &[String],
) -> Result<Vec<MovedMethod>> {
    let mut moved: Vec<MovedMethod> = Vec::with_capacity(planned.len());
    let mut wrote_any = false;
    for (position, step) in planned.iter().enumerate() {
        let completed = || moved.iter().map(|m| m.name.clone()).collect::<Vec<_>>();
        let skipped_after = |from: usize| {
            planned[from..]
                .iter()
                .map(|p| p.name.clone())
                .chain(unmoved.iter().cloned())
                .collect::<Vec<_>>()
        };

        if engine.is_cancelled() {
            warn!(completed = moved.len(), skipped = planned.len() - position, "Batch cancelled");
            return Err(RelocationError::Cancelled {
                completed: completed(),
                skipped: skipped_after(position),
            });
        }

        let result = write_unit(engine, &source.path, &step.source, source.encoding).and_then(|()| {
            wrote_any = true;
            match &step.target {
                Some(unit) => write_unit(engine, &target.path, unit, target.encoding),
                None => Ok(()),
            }
        });
        if let Err(cause) = result {
            if !wrote_any {
                return Err(cause);
            }
            warn!(method = %step.name, error = %cause, "Batch stopped part way");
            return Err(RelocationError::PartialBatch {
                completed: completed(),
                failed: step.name.clone(),
                cause: Box::new(cause),
                skipped: skipped_after(position + 1),
            });
        }

        let workspace = &mut engine.session.workspace;
        workspace.insert(Document {
            path: source.path.clone(),
            unit: step.source.clone(),
            encoding: source.encoding,
        });
        if let Some(unit) = &step.target {
            workspace.insert(Document {
                path: target.path.clone(),
                unit: unit.clone(),
                encoding: target.encoding,
            });
        }
        engine.session.ledger.record(&source.path, &step.name);

        let method = MovedMethod::from_outcome(&step.outcome, step.merge.clone());
        info!(
            method = %method.name,
            target = %target.path.display(),
            made_static = method.made_static,
            "Moved method"
        );
        moved.push(method);
    }
    Ok(moved)
}

fn write_unit(engine: &Engine, path: &Path, unit: &CompilationUnit, encoding: Encoding) -> Result<()> {
    engine
        .fs
        .write_text(path, &TextFile::new(unit.to_source(), encoding))
}

