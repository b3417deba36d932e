//! Main compiler module.
//!
//! This module contains the per-unit [`Compiler`] context and assembles the
//! final WebAssembly text module. The context owns every buffer, counter and
//! function frame used while lowering one program; nothing outlives a call to
//! [`compile`].

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace, warn};

use crate::{
    ast::{ast::Program, statements::FunctionDecl},
    config::{CompilerOptions, StringCoercion},
    errors::errors::CompileError,
    type_checker::{
        type_checker::Analysis,
        types::{Type, ValType},
    },
};

use super::{
    locals::discover_locals,
    runtime::{escape_data, DATA_START, IMPORTS, PAGE_SIZE, RUNTIME_FUNCTIONS},
    stmt::gen_statement,
};

pub const MAIN_FUNCTION: &str = "$program.main";

/// Scratch locals of one function, allocated by nesting depth.
///
/// A temporary is named after the number of temporaries of its kind live
/// when it is acquired, so sibling subtrees reuse the same locals.
#[derive(Debug, Default)]
pub struct TempPool {
    in_use: [u32; 2],
    max: [u32; 2],
}

fn kind_index(kind: ValType) -> usize {
    match kind {
        ValType::F64 => 0,
        ValType::I32 => 1,
    }
}

impl TempPool {
    pub fn acquire(&mut self, kind: ValType, limit: u32, function: &str) -> Result<String, CompileError> {
        let index = kind_index(kind);
        let depth = self.in_use[index];
        if depth >= limit {
            return Err(CompileError::ScratchLocalsExhausted {
                function: function.to_string(),
                kind: match kind {
                    ValType::F64 => "f64",
                    ValType::I32 => "i32",
                },
                limit,
            });
        }

        self.in_use[index] += 1;
        self.max[index] = self.max[index].max(self.in_use[index]);
        Ok(temp_name(kind, depth))
    }

    pub fn release(&mut self, kind: ValType) {
        let index = kind_index(kind);
        self.in_use[index] = self.in_use[index].saturating_sub(1);
    }

    /// `(local ...)` declarations for every temporary ever used.
    pub fn declarations(&self) -> Vec<String> {
        let mut declarations = vec![];
        for kind in [ValType::F64, ValType::I32] {
            for depth in 0..self.max[kind_index(kind)] {
                declarations.push(format!("(local {} {})", temp_name(kind, depth), kind));
            }
        }
        declarations
    }
}

fn temp_name(kind: ValType, depth: u32) -> String {
    format!("$tmp.{}.{}", kind, depth)
}

/// Break and continue targets of an enclosing loop.
#[derive(Debug, Clone)]
pub struct LoopLabels {
    pub break_label: String,
    pub continue_label: String,
}

/// State of the function currently being emitted.
#[derive(Debug)]
pub struct FunctionFrame {
    /// WAT name of the function, e.g. `$fib` or `$lambda.0`
    pub name: String,
    /// Scope whose locals this body sees; `None` for the top-level program
    pub owner: Option<String>,
    pub params: Vec<(String, ValType)>,
    pub result: Option<ValType>,
    /// Declared locals, parameters excluded, in declaration order
    pub locals: Vec<(String, ValType)>,
    /// Kinds of every parameter and local, by source name
    pub local_kinds: HashMap<String, ValType>,
    pub lines: Vec<String>,
    pub indent: usize,
    pub loops: Vec<LoopLabels>,
    pub temps: TempPool,
}

impl FunctionFrame {
    pub fn new(
        name: String,
        owner: Option<String>,
        params: Vec<(String, ValType)>,
        result: Option<ValType>,
    ) -> Self {
        let local_kinds = params.iter().cloned().collect();
        FunctionFrame {
            name,
            owner,
            params,
            result,
            locals: vec![],
            local_kinds,
            lines: vec![],
            indent: 2,
            loops: vec![],
            temps: TempPool::default(),
        }
    }

    pub fn declare_local(&mut self, name: &str, kind: ValType) {
        if !self.local_kinds.contains_key(name) {
            self.local_kinds.insert(name.to_string(), kind);
            self.locals.push((name.to_string(), kind));
        }
    }

    /// Renders the complete `(func ...)` form.
    pub fn render(&self) -> String {
        let mut header = format!("  (func {}", self.name);
        for (name, kind) in &self.params {
            header.push_str(&format!(" (param ${} {})", name, kind));
        }
        if let Some(result) = self.result {
            header.push_str(&format!(" (result {})", result));
        }

        let mut out = vec![header];
        for (name, kind) in &self.locals {
            out.push(format!("    (local ${} {})", name, kind));
        }
        for declaration in self.temps.declarations() {
            out.push(format!("    {}", declaration));
        }
        out.extend(self.lines.iter().cloned());
        out.push(String::from("  )"));

        out.join("\n")
    }
}

/// Where a variable lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Local(String),
    Global(String),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub slot: Slot,
    pub kind: ValType,
    pub ty: Type,
}

/// Static string data, deduplicated by content.
#[derive(Debug)]
pub struct StaticData {
    addresses: HashMap<String, u32>,
    segments: Vec<(u32, String)>,
    next_address: u32,
}

impl Default for StaticData {
    fn default() -> Self {
        StaticData {
            addresses: HashMap::new(),
            segments: vec![],
            next_address: DATA_START,
        }
    }
}

impl StaticData {
    /// Address of the null-terminated copy of `value`.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(address) = self.addresses.get(value) {
            return *address;
        }

        let address = self.next_address;
        self.next_address += value.len() as u32 + 1;
        self.addresses.insert(value.to_string(), address);
        self.segments.push((address, value.to_string()));
        address
    }

    /// First free address after the data, aligned to 8.
    pub fn end(&self) -> u32 {
        (self.next_address + 7) & !7
    }

    pub fn render(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|(address, value)| {
                format!("  (data (i32.const {}) \"{}\")", address, escape_data(value))
            })
            .collect()
    }
}

/// `call_indirect` type descriptors, deduplicated by lowered signature.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    descriptors: Vec<(Vec<ValType>, Option<ValType>)>,
}

impl TypeRegistry {
    pub fn register(&mut self, params: Vec<ValType>, result: Option<ValType>) -> String {
        let signature = (params, result);
        let index = match self.descriptors.iter().position(|known| *known == signature) {
            Some(index) => index,
            None => {
                trace!(index = self.descriptors.len(), ?signature, "new type descriptor");
                self.descriptors.push(signature);
                self.descriptors.len() - 1
            }
        };
        format!("$lambda_type.{}", index)
    }

    pub fn render(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(index, (params, result))| {
                let mut func = String::from("(func");
                for param in params {
                    func.push_str(&format!(" (param {})", param));
                }
                if let Some(result) = result {
                    func.push_str(&format!(" (result {})", result));
                }
                func.push(')');
                format!("  (type $lambda_type.{} {})", index, func)
            })
            .collect()
    }
}

/// The compilation context of one unit.
pub struct Compiler<'a> {
    pub options: &'a CompilerOptions,
    pub analysis: &'a Analysis,

    /// Rendered user functions, in source order
    pub functions: Vec<String>,
    /// Rendered lambdas, in completion order
    pub lambdas: Vec<String>,
    /// Names of lambda functions, indexed by table slot
    pub lambda_names: Vec<String>,
    /// Top-level names the symbol table does not know
    pub extra_globals: Vec<String>,

    pub data: StaticData,
    pub types: TypeRegistry,
    pub label_counter: u32,
    pub next_slot: u32,

    pub frames: Vec<FunctionFrame>,
    main: Option<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(options: &'a CompilerOptions, analysis: &'a Analysis) -> Self {
        Compiler {
            options,
            analysis,
            functions: vec![],
            lambdas: vec![],
            lambda_names: vec![],
            extra_globals: vec![],
            data: StaticData::default(),
            types: TypeRegistry::default(),
            label_counter: 0,
            next_slot: 0,
            frames: vec![],
            main: None,
        }
    }

    pub fn frame(&self) -> &FunctionFrame {
        &self.frames[self.frames.len() - 1]
    }

    pub fn frame_mut(&mut self) -> &mut FunctionFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Appends one instruction at the current indentation.
    pub fn emit(&mut self, line: impl AsRef<str>) {
        let frame = self.frame_mut();
        let indented = format!("{}{}", "  ".repeat(frame.indent), line.as_ref());
        frame.lines.push(indented);
    }

    /// Opens a structured block (`block`, `loop`, `if`).
    pub fn open(&mut self, line: impl AsRef<str>) {
        self.emit(line);
        self.frame_mut().indent += 1;
    }

    /// Emits `else` at the level of the matching `if`.
    pub fn emit_else(&mut self) {
        self.frame_mut().indent -= 1;
        self.emit("else");
        self.frame_mut().indent += 1;
    }

    pub fn close(&mut self) {
        self.frame_mut().indent -= 1;
        self.emit("end");
    }

    pub fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("${}.{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    pub fn acquire_temp(&mut self, kind: ValType) -> Result<String, CompileError> {
        let limit = self.options.max_scratch_locals;
        let frame = self.frame_mut();
        let name = frame.name.clone();
        frame.temps.acquire(kind, limit, &name)
    }

    pub fn release_temp(&mut self, kind: ValType) {
        self.frame_mut().temps.release(kind);
    }

    /// Resolves a source name as the current body sees it.
    pub fn variable(&self, name: &str) -> Option<Variable> {
        let frame = self.frame();
        let symbols = &self.analysis.symbols;

        if let Some(kind) = frame.local_kinds.get(name) {
            let ty = frame
                .owner
                .as_deref()
                .and_then(|owner| symbols.local(owner, name))
                .map(|info| info.ty)
                .unwrap_or(Type::Number);
            return Some(Variable {
                slot: Slot::Local(format!("${}", name)),
                kind: *kind,
                ty,
            });
        }

        if let Some(info) = symbols.global(name) {
            return Some(Variable {
                slot: Slot::Global(format!("${}", name)),
                kind: info.ty.val_type().unwrap_or(ValType::F64),
                ty: info.ty,
            });
        }

        if self.extra_globals.iter().any(|global| global == name) {
            return Some(Variable {
                slot: Slot::Global(format!("${}", name)),
                kind: ValType::F64,
                ty: Type::Number,
            });
        }

        None
    }

    pub fn require_variable(&self, name: &str, line: u32) -> Result<Variable, CompileError> {
        self.variable(name).ok_or_else(|| CompileError::UnresolvedVariable {
            name: name.to_string(),
            line,
        })
    }

    pub fn get_variable(&mut self, variable: &Variable) {
        match &variable.slot {
            Slot::Local(name) => self.emit(format!("local.get {}", name)),
            Slot::Global(name) => self.emit(format!("global.get {}", name)),
        }
    }

    pub fn set_variable(&mut self, variable: &Variable) {
        match &variable.slot {
            Slot::Local(name) => self.emit(format!("local.set {}", name)),
            Slot::Global(name) => self.emit(format!("global.set {}", name)),
        }
    }

    /// Converts the value on the stack from `actual` to `wanted`.
    pub fn coerce(
        &mut self,
        actual: Option<ValType>,
        wanted: ValType,
        line: u32,
    ) -> Result<(), CompileError> {
        match (actual, wanted) {
            (None, _) => return Err(CompileError::VoidValue { line }),
            (Some(ValType::F64), ValType::I32) => self.emit("i32.trunc_sat_f64_u"),
            (Some(ValType::I32), ValType::F64) => self.emit("f64.convert_i32_u"),
            _ => {}
        }
        Ok(())
    }

    /// Emits the zero value of a kind.
    pub fn emit_default(&mut self, kind: ValType) {
        match kind {
            ValType::F64 => self.emit("f64.const 0"),
            ValType::I32 => self.emit("i32.const 0"),
        }
    }

    pub fn push_frame(&mut self, frame: FunctionFrame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<FunctionFrame> {
        self.frames.pop()
    }

    /// Emits a user function into the function buffer.
    pub fn gen_function(&mut self, decl: &FunctionDecl) -> Result<(), CompileError> {
        let analysis = self.analysis;
        let info = analysis
            .symbols
            .function(&decl.name)
            .ok_or_else(|| CompileError::MissingFunctionInfo {
                name: decl.name.clone(),
            })?;

        let params: Vec<(String, ValType)> = info
            .parameters
            .iter()
            .map(|param| (param.name.clone(), param.ty.val_type().unwrap_or(ValType::F64)))
            .collect();
        let param_names: Vec<String> = params.iter().map(|(name, _)| name.clone()).collect();
        let result = info.return_type.val_type();

        let mut frame = FunctionFrame::new(
            format!("${}", decl.name),
            Some(decl.name.clone()),
            params,
            result,
        );
        let discovered = discover_locals(
            &decl.body,
            Some(decl.name.as_str()),
            &param_names,
            &analysis.symbols,
        );
        for (name, kind) in &discovered.locals {
            frame.declare_local(name, *kind);
        }

        debug!(function = %decl.name, locals = frame.locals.len(), "emitting function");
        self.push_frame(frame);
        for stmt in &decl.body {
            gen_statement(self, stmt)?;
        }
        if let Some(result) = result {
            self.emit_default(result);
        }

        if let Some(frame) = self.pop_frame() {
            self.functions.push(frame.render());
        }
        Ok(())
    }

    /// Emits every top-level statement, functions included, in source order.
    pub fn gen_program(&mut self, program: &Program) -> Result<(), CompileError> {
        let discovered = discover_locals(&program.body, None, &[], &self.analysis.symbols);
        self.extra_globals = discovered.extra_globals;

        self.push_frame(FunctionFrame::new(
            String::from(MAIN_FUNCTION),
            None,
            vec![],
            None,
        ));

        for stmt in &program.body {
            gen_statement(self, stmt)?;
        }

        if let Some(frame) = self.pop_frame() {
            self.main = Some(frame.render());
        }
        Ok(())
    }

    fn render_globals(&self) -> Vec<String> {
        let mut globals: BTreeMap<&str, ValType> = BTreeMap::new();
        for info in self.analysis.symbols.globals() {
            globals.insert(&info.name, info.ty.val_type().unwrap_or(ValType::F64));
        }
        for name in &self.extra_globals {
            globals.insert(name, ValType::F64);
        }

        globals
            .into_iter()
            .map(|(name, kind)| format!("  (global ${} (mut {}) ({}.const 0))", name, kind, kind))
            .collect()
    }

    /// Assembles the module text.
    pub fn finish(self) -> String {
        let lambda_count = self.lambda_names.len() as u32;
        let heap_start = self.data.end();
        let needed_pages = heap_start.div_ceil(PAGE_SIZE).max(1);
        let pages = self.options.memory_pages.max(needed_pages);

        let mut out = vec![String::from("(module")];
        out.extend(self.types.render());
        out.push(String::from(IMPORTS));
        out.push(format!("  (memory (export \"memory\") {})", pages));
        out.push(format!("  (table (export \"table\") {} funcref)", lambda_count));
        out.push(format!(
            "  (global $rt.heap_ptr (mut i32) (i32.const {}))",
            heap_start
        ));
        out.push(format!(
            "  (global $rt.next_table_slot (mut i32) (i32.const {}))",
            lambda_count
        ));
        out.extend(self.render_globals());
        out.extend(self.data.render());
        out.extend(RUNTIME_FUNCTIONS.iter().map(|function| function.to_string()));
        if !self.lambda_names.is_empty() {
            out.push(format!(
                "  (elem (i32.const 0) func {})",
                self.lambda_names.join(" ")
            ));
        }
        out.extend(self.lambdas);
        out.extend(self.functions);
        if let Some(main) = self.main {
            out.push(main);
        }
        out.push(format!(
            "  (export \"{}\" (func {}))",
            self.options.entry_export, MAIN_FUNCTION
        ));
        out.push(String::from("  (export \"alloc\" (func $rt.alloc))"));
        out.push(String::from(")"));

        let mut module = out.join("\n");
        module.push('\n');
        module
    }
}

/// Lowers a checked program to a WebAssembly text module.
///
/// # Arguments
///
/// * `program` - The parsed program
/// * `analysis` - The result of type checking `program` without diagnostics
/// * `options` - Code generation options
///
/// # Returns
///
/// The module text, or the first fatal generation error.
pub fn compile(
    program: &Program,
    analysis: &Analysis,
    options: &CompilerOptions,
) -> Result<String, CompileError> {
    if analysis.lambda_count > options.max_table_size {
        return Err(CompileError::TableCapacityExceeded {
            required: analysis.lambda_count,
            capacity: options.max_table_size,
        });
    }
    if options.string_coercion == StringCoercion::Heuristic {
        warn!("heuristic string coercion enabled: integral numbers concatenate as addresses");
    }

    let mut compiler = Compiler::new(options, analysis);
    compiler.gen_program(program)?;

    debug!(
        functions = compiler.functions.len(),
        lambdas = compiler.lambda_names.len(),
        descriptors = compiler.types.descriptors.len(),
        "code generation finished"
    );
    Ok(compiler.finish())
}
