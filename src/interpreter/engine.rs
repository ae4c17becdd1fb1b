// Execution engine for memory scripts

use crate::interpreter::constants::POINTER_SIZE;
use crate::interpreter::errors::ScriptError;
use crate::interpreter::lexer::{
    brace_balance, identifier_prefix, is_identifier, is_indirect_lvalue, lvalue_base,
    new_expression, parse_declaration, split_assignment, split_lines, strip_comments,
    strip_qualifiers, tokenize, trim_statement, unwrap_move, Declarator,
};
use crate::interpreter::rules::classify;
use crate::interpreter::types::{
    discipline_of, is_factory_call, is_null_literal, mentions_smart_pointer, primitive_size,
    split_template, starts_with_smart_type, template_argument,
};
use crate::memory::{BlockId, ClassLayout, Discipline, MemoryError, MemoryManager};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

/// One line about to run in stepwise mode
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// 1-based line number in the script
    pub line_number: usize,
    /// Raw line text, comments included
    pub text: &'a str,
    /// Memory state before the line runs
    pub memory: &'a MemoryManager,
}

/// Class currently being defined
#[derive(Debug, Clone)]
struct OpenClass {
    name: String,
    /// Brace depth inside a member function body
    method_depth: usize,
    /// A member function header was seen and its `{` is expected on the next line
    awaiting_body: bool,
}

/// Line-oriented interpreter driving a [`MemoryManager`]
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    /// Simulated memory
    memory: MemoryManager,

    /// Source name -> block currently denoted by that name
    variables: FxHashMap<String, BlockId>,

    /// Class name -> layout
    classes: FxHashMap<String, Rc<ClassLayout>>,

    /// Class definition in progress, if any
    open_class: Option<OpenClass>,

    /// Brace depth, counted inside and outside the entry function
    scope_depth: usize,

    /// Whether lines are inside the body of `main`
    in_function: bool,

    /// 1-based number of the line being executed
    line: usize,

    last_error: Option<ScriptError>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a whole script, stopping at the first failing line
    ///
    /// State carries over from earlier calls; use [`reset`](Self::reset) to start a
    /// fresh session. Leaks left at the end are logged as events.
    pub fn execute(&mut self, script: &str) -> Result<(), ScriptError> {
        info!("executing script ({} lines)", script.lines().count());
        for (number, raw) in split_lines(script) {
            let text = strip_comments(raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            self.run_line(number, text)?;
        }
        self.finish();
        Ok(())
    }

    /// Run a script one line at a time
    ///
    /// `on_step` sees every non-empty line before it takes effect. Returning
    /// [`ControlFlow::Break`] stops the run without error. When every line has run,
    /// the remaining stack blocks are released as the program's final scope exit.
    pub fn execute_stepwise<F>(&mut self, script: &str, mut on_step: F) -> Result<(), ScriptError>
    where
        F: FnMut(Step<'_>) -> ControlFlow<()>,
    {
        info!("executing script stepwise ({} lines)", script.lines().count());
        for (number, raw) in split_lines(script) {
            let text = strip_comments(raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let step = Step {
                line_number: number,
                text: raw,
                memory: &self.memory,
            };
            if on_step(step).is_break() {
                info!("stepwise run stopped before line {}", number);
                return Ok(());
            }

            self.run_line(number, text)?;
        }

        let mut released = 0;
        while self.memory.end_scope().is_some() {
            released += 1;
        }
        debug!("program end released {} stack blocks", released);

        self.finish();
        Ok(())
    }

    /// Classify and run a single comment-free, trimmed line
    pub fn execute_line(&mut self, line: &str) -> Result<(), ScriptError> {
        let rule = classify(self, line);
        debug!("line {}: {:?}: {}", self.line, rule.kind, line);
        let result = (rule.apply)(self, line);
        if let Err(err) = &result {
            warn!("{}", err);
            self.last_error = Some(err.clone());
        }
        result
    }

    /// Tear down every table and the memory registry
    pub fn reset(&mut self) {
        self.memory.reset();
        self.variables.clear();
        self.classes.clear();
        self.open_class = None;
        self.scope_depth = 0;
        self.in_function = false;
        self.line = 0;
        self.last_error = None;
    }

    // ---- accessors ----

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Block currently bound to `name`
    pub fn variable(&self, name: &str) -> Option<BlockId> {
        self.variables.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, BlockId)> {
        self.variables.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn class_layout(&self, name: &str) -> Option<&Rc<ClassLayout>> {
        self.classes.get(name)
    }

    /// Error raised by the most recent failing line, cleared by a successful run
    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    pub fn in_class(&self) -> bool {
        self.open_class.is_some()
    }

    pub fn in_function(&self) -> bool {
        self.in_function
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    // ---- drivers ----

    fn run_line(&mut self, number: usize, text: &str) -> Result<(), ScriptError> {
        self.line = number;
        self.memory.tick();
        self.execute_line(text)
    }

    fn finish(&mut self) {
        self.last_error = None;
        let leaks = self.memory.report_leaks();
        info!(
            "script finished: {} live blocks, {} leaked",
            self.memory.live_blocks().count(),
            leaks.len()
        );
    }

    // ---- statement handlers ----

    pub(crate) fn ignore(&mut self, _line: &str) -> Result<(), ScriptError> {
        Ok(())
    }

    pub(crate) fn begin_class(&mut self, line: &str) -> Result<(), ScriptError> {
        let tokens = tokenize(line);
        let name = tokens.get(1).map(|t| identifier_prefix(t)).unwrap_or("");
        if name.is_empty() {
            return Err(ScriptError::InvalidClassDeclaration { line: self.line });
        }
        if self.classes.contains_key(name) {
            return Err(ScriptError::ClassRedefinition {
                name: name.to_string(),
                line: self.line,
            });
        }

        self.classes
            .insert(name.to_string(), Rc::new(ClassLayout::new(name)));
        debug!("class {} opened", name);

        // `struct Point { int x; int y; };` on one line
        if let (Some(open), Some(close)) = (line.find('{'), line.rfind('}')) {
            if close > open {
                for member in line[open + 1..close].split(';') {
                    if !member.trim().is_empty() {
                        self.add_members(name, member)?;
                    }
                }
                return Ok(());
            }
        }

        self.open_class = Some(OpenClass {
            name: name.to_string(),
            method_depth: 0,
            awaiting_body: false,
        });
        Ok(())
    }

    pub(crate) fn class_body(&mut self, line: &str) -> Result<(), ScriptError> {
        let Some(open) = self.open_class.as_mut() else {
            return Ok(());
        };

        if open.method_depth > 0 {
            open.method_depth = (open.method_depth as isize + brace_balance(line)).max(0) as usize;
            return Ok(());
        }
        if open.awaiting_body && line.starts_with('{') {
            open.awaiting_body = false;
            open.method_depth = brace_balance(line).max(0) as usize;
            return Ok(());
        }
        open.awaiting_body = false;

        let line = strip_access_specifier(line);
        if line.is_empty() || line == "{" {
            return Ok(());
        }

        if line.starts_with('}') {
            let name = open.name.clone();
            self.open_class = None;
            if let Some(layout) = self.classes.get(&name) {
                debug!("class {} closed ({} bytes)", name, layout.total_size);
            }
            return Ok(());
        }

        if line.contains('(') {
            // Constructor, destructor or another member function
            if line.contains('{') {
                open.method_depth = brace_balance(line).max(0) as usize;
            } else if !line.contains(';') {
                open.awaiting_body = true;
            }

            let destructor = line.contains(&format!("~{}", open.name));
            let constructor = !destructor && names_call(line, &open.name);
            if let Some(layout) = self.classes.get_mut(&open.name) {
                let layout = Rc::make_mut(layout);
                layout.has_destructor |= destructor;
                layout.has_constructor |= constructor;
            }
            return Ok(());
        }

        let name = open.name.clone();
        self.add_members(&name, line)
    }

    pub(crate) fn enter_function(&mut self, line: &str) -> Result<(), ScriptError> {
        let balance = brace_balance(line);
        if line.contains('{') && balance <= 0 {
            debug!("line {}: entry function has an empty body", self.line);
            return Ok(());
        }
        self.in_function = true;
        self.scope_depth = balance.max(0) as usize;
        info!("entering main at line {}", self.line);
        Ok(())
    }

    pub(crate) fn open_scope(&mut self, _line: &str) -> Result<(), ScriptError> {
        self.scope_depth += 1;
        Ok(())
    }

    pub(crate) fn close_scope(&mut self, _line: &str) -> Result<(), ScriptError> {
        if self.scope_depth == 0 {
            return Err(ScriptError::UnexpectedScopeEnd { line: self.line });
        }
        self.scope_depth -= 1;

        if self.in_function {
            if let Some(id) = self.memory.end_scope() {
                debug!("line {}: block #{} left scope", self.line, id);
            }
            if self.scope_depth == 0 {
                self.in_function = false;
                info!("leaving main at line {}", self.line);
            }
        }
        Ok(())
    }

    /// `} else {`
    pub(crate) fn reenter_scope(&mut self, line: &str) -> Result<(), ScriptError> {
        self.close_scope(line)?;
        self.open_scope(line)
    }

    pub(crate) fn delete(&mut self, line: &str) -> Result<(), ScriptError> {
        let rest = line.trim_start().trim_start_matches("delete").trim_start();
        let rest = rest.strip_prefix("[]").unwrap_or(rest);
        let name = trim_statement(rest);
        if !is_identifier(name) {
            return Err(ScriptError::InvalidDelete { line: self.line });
        }

        let id = self.lookup(name)?;
        let slot = self
            .memory
            .block(id)
            .and_then(|block| block.pointer())
            .ok_or_else(|| ScriptError::NotAPointer {
                name: name.to_string(),
                line: self.line,
            })?;
        let discipline = slot.discipline;
        let Some(target) = slot.points_to else {
            return Err(ScriptError::NullDelete {
                name: name.to_string(),
                line: self.line,
            });
        };

        // A shared pointer only gives up its own reference
        if discipline != Discipline::Shared {
            self.memory
                .deallocate(target)
                .map_err(|err| self.rejected(err))?;
        }
        self.memory
            .assign_pointer(id, None)
            .map_err(|err| self.rejected(err))
    }

    /// Declarations with initializers and plain assignments
    pub(crate) fn assignment(&mut self, line: &str) -> Result<(), ScriptError> {
        if let Some(decls) = parse_declaration(line) {
            return self.declare_all(decls);
        }
        match split_assignment(line) {
            Some(assignment) => self.assign(assignment.lhs, assignment.rhs, assignment.compound),
            None => Ok(()),
        }
    }

    pub(crate) fn declaration(&mut self, line: &str) -> Result<(), ScriptError> {
        match parse_declaration(line) {
            Some(decls) => self.declare_all(decls),
            None => Ok(()),
        }
    }

    pub(crate) fn smart_pointer(&mut self, line: &str) -> Result<(), ScriptError> {
        let (decl_part, init) = match split_assignment(line) {
            Some(assignment) if !assignment.compound => (assignment.lhs, Some(assignment.rhs)),
            _ => (trim_statement(line), None),
        };
        let decl_text = strip_qualifiers(decl_part);

        if starts_with_smart_type(decl_text) {
            let Some((pointee, after)) = split_template(decl_text) else {
                return Err(ScriptError::InvalidDeclaration {
                    text: line.to_string(),
                    line: self.line,
                });
            };
            let tag = &decl_text[..decl_text.len() - after.len()];
            let after = after.trim_start();
            let name = identifier_prefix(after);
            if !is_identifier(name) {
                return Err(ScriptError::MissingVariableName { line: self.line });
            }

            // Direct-init: `unique_ptr<T> p(new T)` or `unique_ptr<T> p{new T}`
            let tail = after[name.len()..].trim();
            let direct = tail
                .strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .or_else(|| tail.strip_prefix('{').and_then(|t| t.strip_suffix('}')));

            return self.declare_smart(name, discipline_of(tag), pointee, init.or(direct));
        }

        if identifier_prefix(decl_text) == "auto" {
            let name = identifier_prefix(decl_text["auto".len()..].trim_start());
            if !is_identifier(name) {
                return Err(ScriptError::MissingVariableName { line: self.line });
            }
            let Some(init) = init else {
                return Err(ScriptError::InvalidDeclaration {
                    text: line.to_string(),
                    line: self.line,
                });
            };
            let pointee = template_argument(init).unwrap_or("");
            return self.declare_smart(name, discipline_of(init), pointee, Some(init));
        }

        match init {
            // Re-seat: `p = std::make_shared<T>()`
            Some(init) => self.assign(decl_part, init, false),
            None => {
                debug!("line {}: smart pointer expression not modeled", self.line);
                Ok(())
            }
        }
    }

    // ---- declarations ----

    fn declare_all(&mut self, decls: Vec<Declarator>) -> Result<(), ScriptError> {
        for decl in decls {
            if decl.type_name == "auto" {
                self.declare_auto(&decl)?;
                continue;
            }
            let Some(id) = self.declare(&decl)? else {
                continue;
            };
            if let Some(init) = decl.init.as_deref() {
                if self.pointer_discipline(id).is_some() {
                    self.store_pointer(id, &decl.name, init)?;
                }
            }
        }
        Ok(())
    }

    /// Create the stack block for one declarator and bind its name
    ///
    /// Declarations of types that are neither primitive nor known classes are not
    /// modeled and bind nothing.
    fn declare(&mut self, decl: &Declarator) -> Result<Option<BlockId>, ScriptError> {
        let count = decl.array_len.unwrap_or(1);
        let id = if decl.pointer {
            match decl.array_len {
                Some(_) => {
                    let size = self.array_size(&decl.name, POINTER_SIZE, count)?;
                    self.memory.create_stack_variable(&decl.name, size)
                }
                None => {
                    let class = self.classes.get(&decl.type_name).cloned();
                    self.memory
                        .create_stack_pointer(&decl.name, Discipline::Raw, class)
                }
            }
        } else if let Some(unit) = primitive_size(&decl.type_name) {
            let size = self.array_size(&decl.name, unit, count)?;
            self.memory.create_stack_variable(&decl.name, size)
        } else if let Some(layout) = self.classes.get(&decl.type_name).cloned() {
            match decl.array_len {
                Some(_) => {
                    let size = self.array_size(&decl.name, layout.total_size, count)?;
                    self.memory.create_stack_variable(&decl.name, size)
                }
                None => self.memory.create_class_object(&decl.name, layout),
            }
        } else {
            if decl.init.as_deref().and_then(new_expression).is_some() {
                return Err(ScriptError::UnknownClass {
                    name: decl.type_name.clone(),
                    line: self.line,
                });
            }
            debug!(
                "line {}: type '{}' is not modeled, '{}' ignored",
                self.line, decl.type_name, decl.name
            );
            return Ok(None);
        };

        self.variables.insert(decl.name.clone(), id);
        Ok(Some(id))
    }

    /// `auto name = init;`: the initializer decides what gets declared
    fn declare_auto(&mut self, decl: &Declarator) -> Result<(), ScriptError> {
        let name = decl.name.as_str();
        let init = decl.init.as_deref().map(str::trim).unwrap_or("");

        if let Some(type_text) = new_expression(init) {
            let class = self.classes.get(base_type(type_text)).cloned();
            let id = self.bind_pointer(name, Discipline::Raw, class);
            return self.store_pointer(id, name, init);
        }
        if init.starts_with('&') {
            let id = self.bind_pointer(name, Discipline::Raw, None);
            return self.store_pointer(id, name, init);
        }

        if let Some((source, moved)) = self.pointer_source(init)? {
            let (discipline, class) = self
                .memory
                .block(source)
                .and_then(|block| block.pointer())
                .map(|slot| (slot.discipline, slot.pointee_class.clone()))
                .unwrap_or((Discipline::Raw, None));
            if discipline == Discipline::Shared && !moved {
                return self.bind_shared_copy(source, name);
            }
            let id = self.bind_pointer(name, discipline, class);
            return self.assign_from(id, name, source, moved);
        }

        let size = self
            .variable(init)
            .and_then(|id| self.memory.block(id))
            .map(|block| block.size)
            .unwrap_or_else(|| literal_size(init));
        let id = self.memory.create_stack_variable(name, size);
        self.variables.insert(name.to_string(), id);
        Ok(())
    }

    /// Declare a smart pointer and apply its initializer
    ///
    /// Only factory calls and `new` allocate. Copying a shared pointer goes through
    /// [`MemoryManager::copy_shared`], which creates the new stack slot itself.
    fn declare_smart(
        &mut self,
        name: &str,
        discipline: Discipline,
        pointee: &str,
        init: Option<&str>,
    ) -> Result<(), ScriptError> {
        let class = self.classes.get(base_type(pointee)).cloned();
        let init = init
            .map(str::trim)
            .filter(|init| !init.is_empty() && !is_null_literal(init));

        if let Some(init) = init {
            if let Some((source, moved)) = self.pointer_source(init)? {
                if discipline == Discipline::Shared
                    && !moved
                    && self.pointer_discipline(source) == Some(Discipline::Shared)
                {
                    return self.bind_shared_copy(source, name);
                }
                let id = self.bind_pointer(name, discipline, class);
                return self.assign_from(id, name, source, moved);
            }
        }

        let id = self.bind_pointer(name, discipline, class);
        match init {
            Some(init) => self.store_pointer(id, name, init),
            None => Ok(()),
        }
    }

    fn bind_pointer(
        &mut self,
        name: &str,
        discipline: Discipline,
        class: Option<Rc<ClassLayout>>,
    ) -> BlockId {
        let id = self.memory.create_stack_pointer(name, discipline, class);
        self.variables.insert(name.to_string(), id);
        id
    }

    fn bind_shared_copy(&mut self, source: BlockId, name: &str) -> Result<(), ScriptError> {
        let id = self
            .memory
            .copy_shared(source, name)
            .map_err(|err| self.rejected(err))?;
        self.variables.insert(name.to_string(), id);
        Ok(())
    }

    // ---- assignments ----

    fn assign(&mut self, lhs: &str, rhs: &str, compound: bool) -> Result<(), ScriptError> {
        // Values are not modeled; writes only need their target to exist
        if compound || is_indirect_lvalue(lhs) {
            let base = lvalue_base(lhs);
            if !base.is_empty() {
                self.lookup(base)?;
            }
            return Ok(());
        }
        if !is_identifier(lhs) {
            debug!("line {}: assignment to '{}' not modeled", self.line, lhs);
            return Ok(());
        }

        let id = self.lookup(lhs)?;
        if self.pointer_discipline(id).is_none() {
            return Ok(());
        }
        self.store_pointer(id, lhs, rhs)
    }

    /// Point the pointer `id` (named `name`) at whatever `rhs` denotes
    fn store_pointer(&mut self, id: BlockId, name: &str, rhs: &str) -> Result<(), ScriptError> {
        let rhs = rhs.trim();
        if is_null_literal(rhs) {
            return self.reseat(id, None);
        }

        let discipline = self.pointer_discipline(id).unwrap_or(Discipline::Raw);
        if let Some(type_text) = new_expression(rhs) {
            let target = self.allocate_pointee(type_text, discipline, name)?;
            return self.reseat(id, Some(target));
        }
        if is_factory_call(rhs) {
            let type_text =
                template_argument(rhs).ok_or_else(|| ScriptError::InvalidDeclaration {
                    text: rhs.to_string(),
                    line: self.line,
                })?;
            let target = self.allocate_pointee(type_text, discipline, name)?;
            return self.reseat(id, Some(target));
        }
        if let Some(place) = rhs.strip_prefix('&') {
            let target = self.lookup(lvalue_base(place))?;
            return self
                .memory
                .assign_pointer(id, Some(target))
                .map_err(|err| self.rejected(err));
        }
        if let Some((source, moved)) = self.pointer_source(rhs)? {
            return self.assign_from(id, name, source, moved);
        }

        debug!("line {}: initializer '{}' not modeled", self.line, rhs);
        Ok(())
    }

    /// Pointer-to-pointer assignment `dest = source` (or `dest = std::move(source)`)
    fn assign_from(
        &mut self,
        dest: BlockId,
        dest_name: &str,
        source: BlockId,
        moved: bool,
    ) -> Result<(), ScriptError> {
        if source == dest {
            return Ok(());
        }
        let dest_discipline = self.pointer_discipline(dest);
        let source_discipline = self.pointer_discipline(source);

        let result = match (dest_discipline, source_discipline) {
            (Some(Discipline::Unique), Some(Discipline::Unique)) if moved => {
                self.memory.move_unique(source, dest)
            }
            (Some(Discipline::Shared), Some(Discipline::Shared)) if moved => {
                let target = self.target_of(source);
                self.memory
                    .assign_pointer(dest, target)
                    .and_then(|()| self.memory.assign_pointer(source, None))
            }
            (Some(Discipline::Shared), Some(Discipline::Shared)) => {
                // Copy-assignment: the name now denotes a fresh copy of the source
                self.memory
                    .assign_pointer(dest, None)
                    .map_err(|err| self.rejected(err))?;
                return self.bind_shared_copy(source, dest_name);
            }
            _ => {
                let target = self.target_of(source);
                self.memory.assign_pointer(dest, target)
            }
        };
        result.map_err(|err| self.rejected(err))
    }

    /// Point `id` at `target`; a unique pointer destroys what it owned before
    fn reseat(&mut self, id: BlockId, target: Option<BlockId>) -> Result<(), ScriptError> {
        if self.pointer_discipline(id) == Some(Discipline::Unique) {
            if let Some(old) = self.target_of(id).filter(|&old| Some(old) != target) {
                self.memory
                    .deallocate(old)
                    .map_err(|err| self.rejected(err))?;
            }
        }
        self.memory
            .assign_pointer(id, target)
            .map_err(|err| self.rejected(err))
    }

    /// Heap allocation for `new T`, `new T(...)`, `new T[n]` or a factory argument
    fn allocate_pointee(
        &mut self,
        type_text: &str,
        discipline: Discipline,
        owner: &str,
    ) -> Result<BlockId, ScriptError> {
        let base = base_type(type_text);
        let count = type_text
            .find('[')
            .and_then(|open| type_text[open + 1..].split(']').next())
            .and_then(|len| len.trim().parse::<usize>().ok());
        let name = format!("*{}", owner);

        if let Some(unit) = primitive_size(base) {
            let size = self.array_size(&name, unit, count.unwrap_or(1))?;
            return Ok(self.memory.allocate_heap(&name, size, discipline));
        }
        match self.classes.get(base).cloned() {
            Some(layout) => match count {
                Some(count) => {
                    let size = self.array_size(&name, layout.total_size, count)?;
                    Ok(self.memory.allocate_heap(&name, size, discipline))
                }
                None => Ok(self
                    .memory
                    .allocate_class_object_heap(&name, layout, discipline)),
            },
            None => Err(ScriptError::UnknownClass {
                name: base.to_string(),
                line: self.line,
            }),
        }
    }

    // ---- class members ----

    fn add_members(&mut self, class_name: &str, text: &str) -> Result<(), ScriptError> {
        let text = trim_statement(text);
        let mut members: Vec<(String, String, usize)> = Vec::new();

        if mentions_smart_pointer(text) {
            // `std::unique_ptr<Weapon> weapon;`
            if let Some((_, after)) = split_template(text) {
                let member = identifier_prefix(after.trim_start());
                if is_identifier(member) {
                    let type_name = text[..text.len() - after.len()].trim();
                    members.push((member.to_string(), type_name.to_string(), POINTER_SIZE));
                }
            }
        } else if let Some(decls) = parse_declaration(text) {
            for decl in decls {
                let unit = if decl.pointer {
                    POINTER_SIZE
                } else if let Some(size) = primitive_size(&decl.type_name) {
                    size
                } else if decl.type_name == class_name {
                    return Err(ScriptError::RecursiveClass {
                        name: class_name.to_string(),
                        line: self.line,
                    });
                } else if let Some(layout) = self.classes.get(&decl.type_name) {
                    layout.total_size
                } else {
                    return Err(ScriptError::UnknownClass {
                        name: decl.type_name.clone(),
                        line: self.line,
                    });
                };
                let type_name = if decl.pointer {
                    format!("{}*", decl.type_name)
                } else {
                    decl.type_name.clone()
                };
                let size = self.array_size(&decl.name, unit, decl.array_len.unwrap_or(1))?;
                members.push((decl.name, type_name, size));
            }
        }

        let current = self.classes.get(class_name).map_or(0, |l| l.total_size);
        let added = members
            .iter()
            .try_fold(current, |total, (_, _, size)| total.checked_add(*size));
        if added.is_none() {
            return Err(ScriptError::SizeOverflow {
                name: class_name.to_string(),
                line: self.line,
            });
        }

        if let Some(layout) = self.classes.get_mut(class_name) {
            let layout = Rc::make_mut(layout);
            for (name, type_name, size) in members {
                layout.push_member(name, type_name, size);
            }
        }
        Ok(())
    }

    // ---- helpers ----

    /// Block bound to `name`, which must still be allocated
    fn lookup(&self, name: &str) -> Result<BlockId, ScriptError> {
        let id = self
            .variable(name)
            .ok_or_else(|| ScriptError::UndefinedVariable {
                name: name.to_string(),
                line: self.line,
            })?;
        if !self.memory.block(id).is_some_and(|block| block.allocated) {
            return Err(ScriptError::OutOfScope {
                name: name.to_string(),
                line: self.line,
            });
        }
        Ok(id)
    }

    /// Byte size of `count` elements of `unit` bytes each
    fn array_size(&self, name: &str, unit: usize, count: usize) -> Result<usize, ScriptError> {
        unit.checked_mul(count)
            .ok_or_else(|| ScriptError::SizeOverflow {
                name: name.to_string(),
                line: self.line,
            })
    }

    /// Pointer variable named by `rhs`, possibly wrapped in `std::move` or `.get()`
    ///
    /// Returns `None` for expressions that are not a single name, and for names
    /// bound to non-pointer blocks.
    fn pointer_source(&self, rhs: &str) -> Result<Option<(BlockId, bool)>, ScriptError> {
        let (name, moved) = match unwrap_move(rhs) {
            Some(inner) => (inner, true),
            None => (rhs.trim(), false),
        };
        let name = name.strip_suffix(".get()").unwrap_or(name);
        if !is_identifier(name) || matches!(name, "true" | "false" | "this") {
            return Ok(None);
        }
        let id = self.lookup(name)?;
        Ok(self.pointer_discipline(id).map(|_| (id, moved)))
    }

    fn pointer_discipline(&self, id: BlockId) -> Option<Discipline> {
        self.memory
            .block(id)
            .and_then(|block| block.pointer())
            .map(|slot| slot.discipline)
    }

    fn target_of(&self, id: BlockId) -> Option<BlockId> {
        self.memory.block(id).and_then(|block| block.points_to())
    }

    fn rejected(&self, source: MemoryError) -> ScriptError {
        ScriptError::Rejected {
            source,
            line: self.line,
        }
    }
}

/// Drop a leading `public:` / `private:` / `protected:`
fn strip_access_specifier(line: &str) -> &str {
    ["public:", "private:", "protected:"]
        .iter()
        .find_map(|spec| line.strip_prefix(spec))
        .map(str::trim)
        .unwrap_or(line)
}

/// Whether `line` contains `name(` with `name` as a whole word
fn names_call(line: &str, name: &str) -> bool {
    line.match_indices(name).any(|(idx, _)| {
        let whole_word = line[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
        whole_word && line[idx + name.len()..].trim_start().starts_with('(')
    })
}

/// `Point(1, 2)` -> `Point`, `int[4]` -> `int`
fn base_type(type_text: &str) -> &str {
    let end = type_text
        .find(|c: char| matches!(c, '(' | '[' | '{'))
        .unwrap_or(type_text.len());
    type_text[..end].trim()
}

/// Size guessed from a literal initializer of an `auto` variable
fn literal_size(init: &str) -> usize {
    if matches!(init, "true" | "false") || init.starts_with('\'') {
        1
    } else if init.parse::<i32>().is_ok() {
        4
    } else {
        POINTER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::EventKind;

    fn run(script: &str) -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.execute(script).unwrap();
        interpreter
    }

    fn target(interpreter: &Interpreter, name: &str) -> Option<BlockId> {
        let id = interpreter.variable(name).unwrap();
        interpreter.memory().block(id).unwrap().points_to()
    }

    #[test]
    fn test_lines_outside_main_have_no_effect() {
        let interpreter = run("int global;\nint* g = new int;\n");
        assert!(interpreter.memory().blocks().is_empty());
        assert_eq!(interpreter.variable("global"), None);
    }

    #[test]
    fn test_class_layout_skips_methods() {
        let interpreter = run(
            "class Player {\n\
             public:\n\
                 int health;\n\
                 Player() : health(100) {}\n\
                 ~Player() {\n\
                     health = 0;\n\
                 }\n\
                 void heal(int amount)\n\
                 {\n\
                     int scratch = amount;\n\
                 }\n\
                 double speed;\n\
                 Player* target;\n\
             };\n",
        );
        let layout = interpreter.class_layout("Player").unwrap();
        let names: Vec<&str> = layout.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["health", "speed", "target"]);
        assert_eq!(layout.total_size, 4 + 8 + 8);
        assert!(layout.has_constructor);
        assert!(layout.has_destructor);
        assert!(!interpreter.in_class());
    }

    #[test]
    fn test_nested_class_and_one_line_struct() {
        let interpreter = run(
            "struct Vec2 { float x; float y; };\n\
             class Entity {\n\
                 Vec2 position;\n\
                 int ids[3];\n\
                 std::unique_ptr<Vec2> target;\n\
             };\n",
        );
        assert_eq!(interpreter.class_layout("Vec2").unwrap().total_size, 8);
        let entity = interpreter.class_layout("Entity").unwrap();
        assert_eq!(entity.total_size, 8 + 12 + 8);
        assert_eq!(entity.member("position").unwrap().type_name, "Vec2");
    }

    #[test]
    fn test_class_errors() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .execute("class Node {\n  Node next;\n};")
            .unwrap_err();
        assert!(matches!(err, ScriptError::RecursiveClass { line: 2, .. }));

        interpreter.reset();
        let err = interpreter
            .execute("class A {\n};\nclass A {\n};")
            .unwrap_err();
        assert!(matches!(err, ScriptError::ClassRedefinition { line: 3, .. }));

        interpreter.reset();
        let err = interpreter
            .execute("class B {\n  Missing m;\n};")
            .unwrap_err();
        assert!(matches!(err, ScriptError::UnknownClass { .. }));
    }

    #[test]
    fn test_delete_errors() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .execute("int main() {\n  delete ghost;\n}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::UndefinedVariable { line: 2, .. }));

        interpreter.reset();
        let err = interpreter
            .execute("int main() {\n  int x;\n  delete x;\n}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::NotAPointer { line: 3, .. }));

        interpreter.reset();
        let err = interpreter
            .execute("int main() {\n  int* p = new int;\n  delete p;\n  delete p;\n}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::NullDelete { line: 4, .. }));
        assert_eq!(interpreter.last_error(), Some(&err));
    }

    #[test]
    fn test_unknown_class_in_new() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .execute("int main() {\n  Widget* w = new Widget;\n}")
            .unwrap_err();
        assert_eq!(err.to_string(), "Line 2: unknown class 'Widget'");
    }

    #[test]
    fn test_unexpected_scope_end() {
        let mut interpreter = Interpreter::new();
        let err = interpreter.execute("}\n").unwrap_err();
        assert_eq!(err, ScriptError::UnexpectedScopeEnd { line: 1 });
    }

    #[test]
    fn test_smart_pointer_forms() {
        let interpreter = run(
            "int main() {\n\
                 std::unique_ptr<int> a = std::make_unique<int>(5);\n\
                 std::unique_ptr<int> b(new int);\n\
                 std::unique_ptr<int> c = nullptr;\n\
                 auto d = std::make_shared<double>();\n\
                 std::shared_ptr<double> e{nullptr};\n",
        );
        let memory = interpreter.memory();

        let a = target(&interpreter, "a").unwrap();
        assert_eq!(memory.block(a).unwrap().size, 4);
        assert!(target(&interpreter, "b").is_some());
        assert_eq!(target(&interpreter, "c"), None);

        let d = target(&interpreter, "d").unwrap();
        assert_eq!(memory.block(d).unwrap().ref_count(), Some(1));
        assert_eq!(memory.block(d).unwrap().size, 8);
        assert_eq!(target(&interpreter, "e"), None);
    }

    #[test]
    fn test_unique_move_and_reseat() {
        let interpreter = run(
            "int main() {\n\
                 std::unique_ptr<int> a = std::make_unique<int>();\n\
                 std::unique_ptr<int> b = std::move(a);\n\
                 b = std::make_unique<int>();\n",
        );
        let memory = interpreter.memory();
        assert_eq!(target(&interpreter, "a"), None);

        // The first allocation was destroyed when `b` was re-seated.
        let first = memory
            .blocks()
            .iter()
            .find(|block| block.name == "*a")
            .unwrap();
        assert!(!first.allocated);
        assert!(target(&interpreter, "b").is_some());
    }

    #[test]
    fn test_shared_copy_assignment_rebinds_name() {
        let interpreter = run(
            "int main() {\n\
                 std::shared_ptr<int> a = std::make_shared<int>();\n\
                 std::shared_ptr<int> b;\n\
                 b = a;\n",
        );
        let shared = target(&interpreter, "a").unwrap();
        assert_eq!(target(&interpreter, "b"), Some(shared));
        assert_eq!(
            interpreter.memory().block(shared).unwrap().ref_count(),
            Some(2)
        );
        assert_eq!(
            interpreter.memory().events().last().map(|e| e.kind),
            Some(EventKind::Copy)
        );
    }

    #[test]
    fn test_delete_shared_drops_one_reference() {
        let interpreter = run(
            "int main() {\n\
                 std::shared_ptr<int> a = std::make_shared<int>();\n\
                 std::shared_ptr<int> b = a;\n\
                 delete b;\n",
        );
        let shared = target(&interpreter, "a").unwrap();
        let block = interpreter.memory().block(shared).unwrap();
        assert!(block.allocated);
        assert_eq!(block.ref_count(), Some(1));
        assert_eq!(target(&interpreter, "b"), None);
    }

    #[test]
    fn test_declarations() {
        let interpreter = run(
            "class Point { int x; int y; };\n\
             int main() {\n\
                 int a, *b, c[4];\n\
                 unsigned char flag = 1;\n\
                 Point p(1, 2);\n\
                 Point* q = &p;\n\
                 auto n = 42;\n\
                 std::string label;\n",
        );
        let size = |name: &str| {
            let id = interpreter.variable(name).unwrap();
            interpreter.memory().block(id).unwrap().size
        };
        assert_eq!(size("a"), 4);
        assert_eq!(size("b"), 8);
        assert_eq!(size("c"), 16);
        assert_eq!(size("flag"), 1);
        assert_eq!(size("p"), 8);
        assert_eq!(size("n"), 4);
        assert_eq!(target(&interpreter, "q"), interpreter.variable("p"));
        assert_eq!(interpreter.variable("label"), None);
    }

    #[test]
    fn test_writes_through_pointers_need_bound_names() {
        let mut interpreter = Interpreter::new();
        interpreter
            .execute("int main() {\n  int* p = new int;\n  *p = 5;\n  p[0] += 1;\n")
            .unwrap();
        let err = interpreter.execute("  q->value = 1;\n").unwrap_err();
        assert!(matches!(err, ScriptError::UndefinedVariable { ref name, .. } if name == "q"));
    }

    #[test]
    fn test_if_else_braces() {
        let interpreter = run(
            "int main() {\n\
                 int* p = new int;\n\
                 if (p != nullptr) {\n\
                     int local;\n\
                 } else {\n\
                     int other;\n\
                 }\n\
                 delete p;\n\
             }\n",
        );
        assert!(!interpreter.in_function());
        assert_eq!(interpreter.scope_depth(), 0);
        assert!(interpreter.memory().detect_leaks().is_empty());
    }

    #[test]
    fn test_oversized_arrays_are_rejected() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .execute("int main() {\n  int a[9000000000000000000];\n}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::SizeOverflow { ref name, line: 2 } if name == "a"));
        assert_eq!(interpreter.variable("a"), None);

        interpreter.reset();
        let err = interpreter
            .execute("int main() {\n  int* p = new int[9000000000000000000];\n}")
            .unwrap_err();
        assert!(matches!(err, ScriptError::SizeOverflow { line: 2, .. }));
        assert!(interpreter.memory().live_blocks().all(|block| block.is_stack()));

        interpreter.reset();
        let err = interpreter
            .execute("class Big {\n  double data[9000000000000000000];\n};")
            .unwrap_err();
        assert!(matches!(err, ScriptError::SizeOverflow { line: 2, .. }));
    }

    #[test]
    fn test_large_arrays_within_range_still_allocate() {
        let interpreter = run(
            "int main() {\n\
                 char* a = new char[10000000000000000000];\n\
                 char* b = new char[10000000000000000000];\n",
        );
        let a = target(&interpreter, "a").unwrap();
        let b = target(&interpreter, "b").unwrap();
        let memory = interpreter.memory();
        assert!(memory.block(b).unwrap().address > memory.block(a).unwrap().address);
        assert_eq!(memory.block(b).unwrap().size, 10_000_000_000_000_000_000);
        assert_eq!(memory.stats().heap_bytes, usize::MAX);
    }

    #[test]
    fn test_out_of_scope_names_change_nothing() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .execute("int main() {\n  int* p = new int;\n  {\n  }\n  delete p;\n")
            .unwrap_err();
        assert!(matches!(err, ScriptError::OutOfScope { ref name, line: 5 } if name == "p"));
        let heap = interpreter
            .memory()
            .blocks()
            .iter()
            .find(|block| block.name == "*p")
            .unwrap();
        assert!(heap.allocated);

        let blocks = interpreter.memory().blocks().len();
        let err = interpreter.execute("  p = new int;\n").unwrap_err();
        assert!(matches!(err, ScriptError::OutOfScope { .. }));
        assert_eq!(interpreter.memory().blocks().len(), blocks);
    }

    #[test]
    fn test_unique_copy_aliases_in_both_forms() {
        let interpreter = run(
            "int main() {\n\
                 std::unique_ptr<int> p = std::make_unique<int>();\n\
                 auto q = p;\n\
                 std::unique_ptr<int> r = p;\n",
        );
        let owned = target(&interpreter, "p").unwrap();
        assert_eq!(target(&interpreter, "q"), Some(owned));
        assert_eq!(target(&interpreter, "r"), Some(owned));
    }

    #[test]
    fn test_stepwise_break_stops_without_error() {
        let mut interpreter = Interpreter::new();
        let mut seen = Vec::new();
        let result = interpreter.execute_stepwise(
            "int main() {\n  int* p = new int;\n  delete p;\n}\n",
            |step| {
                seen.push(step.line_number);
                if step.line_number == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        assert!(result.is_ok());
        assert_eq!(seen, vec![1, 2, 3]);
        // Line 3 never ran, so the allocation is still alive.
        let p = interpreter.variable("p").unwrap();
        assert!(interpreter.memory().block(p).unwrap().points_to().is_some());
    }

    #[test]
    fn test_stepwise_callback_sees_state_before_line() {
        let mut interpreter = Interpreter::new();
        let mut blocks_before = Vec::new();
        interpreter
            .execute_stepwise("int main() {\n  int x;\n  int y;\n", |step| {
                blocks_before.push(step.memory.blocks().len());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(blocks_before, vec![0, 0, 1]);
        // Remaining stack blocks are released at program end.
        assert_eq!(interpreter.memory().stack_depth(), 0);
    }
}
