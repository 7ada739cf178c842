//! Bytecode definitions and the builder lowering emits into.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::Error;
use crate::runtime::function::FunctionCode;
use crate::runtime::value::Value;

/// A compiled bytecode chunk.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// The constant pool
    pub constants: Vec<Value>,
    /// Nested functions, referenced by `Closure`
    pub functions: Vec<Arc<FunctionCode>>,
}

impl Bytecode {
    /// Creates a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts instructions with the given opcode.
    pub fn count(&self, opcode: OpCode) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.opcode == opcode)
            .count()
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }

    /// Net change in operand stack height when execution falls through.
    pub fn stack_effect(&self) -> i32 {
        use OpCode::*;
        let args = match self.operand {
            Some(Operand::ArgCount(n)) | Some(Operand::Call { args: n, .. }) => i32::from(n),
            _ => 0,
        };
        match self.opcode {
            LoadConst | LoadUndefined | LoadNull | LoadTrue | LoadFalse | Dup | LoadLocal
            | LoadSlot | LoadName | LoadNameOrUndefined | DeleteName | Closure | NewObject
            | NewArray | ForInHasNext | ForInNext | LoadThis => 1,
            Dup2 | LoadNameWithThis => 2,
            Swap | Neg | ToNumber | Not | BitNot | TypeOf | StoreSlot | StoreName
            | StoreNameStrict | Jump | EnterTry | LeaveTry | PopScope => 0,
            Pop | Add | Sub | Mul | Div | Mod | Eq | Ne | StrictEq | StrictNe | Lt | Le | Gt
            | Ge | BitAnd | BitOr | BitXor | Shl | Shr | Ushr | InstanceOf | In | StoreLocal
            | GetProperty | DeleteProperty | DefineProperty | JumpIfFalse | JumpIfTrue
            | LogicalAnd | LogicalOr | Return | ForInPrepare | PushCatchScope | PushWithScope
            | Throw => -1,
            SetProperty => -2,
            Call | CallEval => -(args + 1),
            New => -args,
        }
    }

    /// Stack height change on the branch-taken path of a jump.
    fn taken_effect(&self) -> i32 {
        match self.opcode {
            // Short-circuit keeps the tested value.
            OpCode::LogicalAnd | OpCode::LogicalOr | OpCode::Jump => 0,
            // The handler starts with the exception pushed.
            OpCode::EnterTry => 1,
            _ => self.stack_effect(),
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Constant pool index
    Constant(u16),
    /// Frame-local temporary index
    Local(u16),
    /// Absolute instruction index (a label id until the builder finishes)
    Jump(usize),
    /// Number of arguments or elements
    ArgCount(u16),
    /// Name or property key, as an index into the constant pool
    Property(u16),
    /// Environment slot `depth` links up the scope chain
    Slot {
        /// Parent links to follow
        depth: u16,
        /// Slot index
        index: u16,
    },
    /// Index into the nested function table
    Function(u16),
    /// A call: argument count and a constant describing the callee
    Call {
        /// Number of arguments on the stack
        args: u16,
        /// Constant pool index of the callee's description
        callee: u16,
    },
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Push a constant onto the stack
    LoadConst,
    /// Push undefined
    LoadUndefined,
    /// Push null
    LoadNull,
    /// Push true
    LoadTrue,
    /// Push false
    LoadFalse,
    /// Pop the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top two values
    Dup2,
    /// Swap top two values on stack
    Swap,

    // Arithmetic operations
    /// Add top two values
    Add,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,
    /// Modulo
    Mod,
    /// Negate (unary minus)
    Neg,
    /// Numeric coercion (unary plus)
    ToNumber,

    // Comparison operations
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Strict equal (===)
    StrictEq,
    /// Strict not equal (!==)
    StrictNe,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,

    // Logical operations
    /// Logical NOT
    Not,

    // Bitwise operations
    /// Bitwise AND
    BitAnd,
    /// Bitwise OR
    BitOr,
    /// Bitwise XOR
    BitXor,
    /// Bitwise NOT
    BitNot,
    /// Left shift
    Shl,
    /// Signed right shift
    Shr,
    /// Unsigned right shift
    Ushr,

    // Temporaries
    /// Push a frame-local temporary
    LoadLocal,
    /// Pop into a frame-local temporary
    StoreLocal,

    // Variable operations
    /// Push an environment slot
    LoadSlot,
    /// Store the top value into an environment slot (value stays)
    StoreSlot,
    /// Push a variable found by name; ReferenceError if unbound
    LoadName,
    /// Push a variable found by name, undefined if unbound
    LoadNameOrUndefined,
    /// Push a variable and the implicit `this` of its environment
    LoadNameWithThis,
    /// Assign by name, creating a global if unbound (value stays)
    StoreName,
    /// Assign by name, ReferenceError if unbound (value stays)
    StoreNameStrict,
    /// Delete a binding by name, push the result
    DeleteName,

    // Property operations
    /// [obj, key] -> value
    GetProperty,
    /// [obj, key, value] -> value
    SetProperty,
    /// [obj, key] -> bool
    DeleteProperty,
    /// [obj, value] -> obj, defines the named property
    DefineProperty,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Pop, jump if false
    JumpIfFalse,
    /// Pop, jump if true
    JumpIfTrue,
    /// Jump keeping the value if falsy, otherwise pop
    LogicalAnd,
    /// Jump keeping the value if truthy, otherwise pop
    LogicalOr,

    // Function operations
    /// [callee, this, args...] -> result
    Call,
    /// Like `Call`, but runs eval code in place when the callee is `eval`
    CallEval,
    /// [constructor, args...] -> object
    New,
    /// Return from function
    Return,
    /// Create a closure over the active scope
    Closure,

    // Object operations
    /// Create a new object
    NewObject,
    /// Create a new array of the given length
    NewArray,
    /// typeof operator
    TypeOf,
    /// instanceof operator
    InstanceOf,
    /// in operator
    In,

    // Iteration
    /// Pop an object and snapshot its keys into a temporary
    ForInPrepare,
    /// Push whether the snapshot has keys left
    ForInHasNext,
    /// Push the next key of the snapshot
    ForInNext,

    // Exceptions and scopes
    /// Open an exception region whose handler is the jump target
    EnterTry,
    /// Close the innermost exception region
    LeaveTry,
    /// Pop the exception into a fresh catch scope
    PushCatchScope,
    /// Pop an object into a fresh with scope
    PushWithScope,
    /// Return to the parent scope
    PopScope,
    /// Throw an exception
    Throw,

    // Special
    /// this keyword
    LoadThis,
}

/// A jump target handed out by [`BytecodeBuilder::new_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug, Clone, Default)]
struct LabelState {
    position: Option<usize>,
    depth: Option<i32>,
}

/// Emits instructions, resolves labels and tracks operand stack height.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    bytecode: Bytecode,
    labels: Vec<LabelState>,
    fixups: Vec<(usize, Label)>,
    depth: i32,
    local_count: u16,
    strings: FxHashMap<String, u16>,
    numbers: FxHashMap<u64, u16>,
}

impl BytecodeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current operand stack height.
    pub fn stack_depth(&self) -> i32 {
        self.depth
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.bytecode.instructions.len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.bytecode.instructions.is_empty()
    }

    /// Emits an instruction without operand.
    pub fn emit(&mut self, opcode: OpCode) -> usize {
        self.push(Instruction::simple(opcode))
    }

    /// Emits an instruction with an operand.
    pub fn emit_with(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.push(Instruction::with_operand(opcode, operand))
    }

    fn push(&mut self, instruction: Instruction) -> usize {
        self.depth += instruction.stack_effect();
        let index = self.bytecode.instructions.len();
        self.bytecode.instructions.push(instruction);
        index
    }

    /// Allocates a label to be marked later.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() - 1)
    }

    /// Emits a jump-like instruction targeting `label`.
    pub fn emit_jump(&mut self, opcode: OpCode, label: Label) {
        let instruction = Instruction::with_operand(opcode, Operand::Jump(label.0));
        let taken = self.depth + instruction.taken_effect();
        let state = &mut self.labels[label.0];
        if state.depth.is_none() {
            state.depth = Some(taken);
        }
        let index = self.push(instruction);
        self.fixups.push((index, label));
    }

    /// Binds `label` to the next instruction.
    ///
    /// After an unconditional transfer the height is whatever the jumps
    /// into this label left on the stack.
    pub fn mark_label(&mut self, label: Label) {
        let unreachable = matches!(
            self.bytecode.instructions.last().map(|i| i.opcode),
            Some(OpCode::Jump | OpCode::Return | OpCode::Throw)
        );
        let state = &mut self.labels[label.0];
        state.position = Some(self.bytecode.instructions.len());
        match state.depth {
            Some(depth) if unreachable => self.depth = depth,
            Some(_) => {}
            None => state.depth = Some(self.depth),
        }
    }

    /// Reserves a frame-local temporary.
    pub fn declare_local(&mut self) -> Result<u16, Error> {
        let index = self.local_count;
        self.local_count = index
            .checked_add(1)
            .ok_or_else(|| Error::RangeError("Too many locals".into()))?;
        Ok(index)
    }

    /// Adds a constant and returns its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u16, Error> {
        let index = pool_index(self.bytecode.constants.len(), "constants")?;
        self.bytecode.constants.push(value);
        Ok(index)
    }

    /// Interned number constant. Keyed on the bit pattern so `0` and `-0`
    /// stay distinct.
    pub fn number_constant(&mut self, n: f64) -> Result<u16, Error> {
        if let Some(&index) = self.numbers.get(&n.to_bits()) {
            return Ok(index);
        }
        let index = self.add_constant(Value::Number(n))?;
        self.numbers.insert(n.to_bits(), index);
        Ok(index)
    }

    /// Interned string constant, used for names and property keys.
    pub fn string_constant(&mut self, s: &str) -> Result<u16, Error> {
        if let Some(&index) = self.strings.get(s) {
            return Ok(index);
        }
        let index = self.add_constant(Value::from(s))?;
        self.strings.insert(s.to_string(), index);
        Ok(index)
    }

    /// Adds a nested function and returns its index.
    pub fn add_function(&mut self, code: Arc<FunctionCode>) -> Result<u16, Error> {
        let index = pool_index(self.bytecode.functions.len(), "functions")?;
        self.bytecode.functions.push(code);
        Ok(index)
    }

    /// Resolves every jump and returns the finished chunk with its
    /// temporary count.
    pub fn finish(mut self) -> Result<(Bytecode, usize), Error> {
        for (index, label) in std::mem::take(&mut self.fixups) {
            let target = self.labels[label.0]
                .position
                .ok_or_else(|| Error::InternalError(format!("label {} never marked", label.0)))?;
            self.bytecode.instructions[index].operand = Some(Operand::Jump(target));
        }
        Ok((self.bytecode, usize::from(self.local_count)))
    }
}

/// Operands address pools with 16 bits.
fn pool_index(len: usize, what: &str) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::RangeError(format!("Too many {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_resolve_to_positions() {
        let mut builder = BytecodeBuilder::new();
        let end = builder.new_label();
        builder.emit(OpCode::LoadTrue);
        builder.emit_jump(OpCode::JumpIfFalse, end);
        builder.emit(OpCode::LoadNull);
        builder.emit(OpCode::Pop);
        builder.mark_label(end);
        builder.emit(OpCode::LoadUndefined);

        let (code, _) = builder.finish().unwrap();
        assert_eq!(code.instructions[1].operand, Some(Operand::Jump(4)));
    }

    #[test]
    fn test_unmarked_label_is_internal_error() {
        let mut builder = BytecodeBuilder::new();
        let nowhere = builder.new_label();
        builder.emit_jump(OpCode::Jump, nowhere);
        assert!(matches!(builder.finish(), Err(Error::InternalError(_))));
    }

    #[test]
    fn test_depth_resets_after_unconditional_jump() {
        let mut builder = BytecodeBuilder::new();
        let else_label = builder.new_label();
        let end = builder.new_label();

        builder.emit(OpCode::LoadTrue);
        builder.emit_jump(OpCode::JumpIfFalse, else_label);
        builder.emit(OpCode::LoadConst);
        builder.emit_jump(OpCode::Jump, end);
        builder.mark_label(else_label);
        assert_eq!(builder.stack_depth(), 0);
        builder.emit(OpCode::LoadNull);
        builder.mark_label(end);
        assert_eq!(builder.stack_depth(), 1);
    }

    #[test]
    fn test_short_circuit_keeps_value_on_taken_path() {
        let mut builder = BytecodeBuilder::new();
        let end = builder.new_label();
        builder.emit(OpCode::LoadTrue);
        builder.emit_jump(OpCode::LogicalAnd, end);
        assert_eq!(builder.stack_depth(), 0);
        builder.emit(OpCode::LoadFalse);
        builder.mark_label(end);
        assert_eq!(builder.stack_depth(), 1);
    }

    #[test]
    fn test_handler_starts_with_exception() {
        let mut builder = BytecodeBuilder::new();
        let handler = builder.new_label();
        builder.emit_jump(OpCode::EnterTry, handler);
        builder.emit(OpCode::LeaveTry);
        let after = builder.new_label();
        builder.emit_jump(OpCode::Jump, after);
        builder.mark_label(handler);
        assert_eq!(builder.stack_depth(), 1);
        builder.emit(OpCode::Pop);
        builder.mark_label(after);
        assert_eq!(builder.stack_depth(), 0);
    }

    #[test]
    fn test_call_stack_effect_counts_callee_and_this() {
        let call = Instruction::with_operand(OpCode::Call, Operand::Call { args: 2, callee: 0 });
        assert_eq!(call.stack_effect(), -3);
        let new = Instruction::with_operand(OpCode::New, Operand::ArgCount(2));
        assert_eq!(new.stack_effect(), -2);
    }

    #[test]
    fn test_string_constants_are_interned() {
        let mut builder = BytecodeBuilder::new();
        let a = builder.string_constant("x").unwrap();
        let b = builder.string_constant("x").unwrap();
        assert_eq!(a, b);
        assert_eq!(builder.declare_local().unwrap(), 0);
        assert_eq!(builder.declare_local().unwrap(), 1);
    }

    #[test]
    fn test_number_constants_are_interned() {
        let mut builder = BytecodeBuilder::new();
        let one = builder.number_constant(1.0).unwrap();
        assert_eq!(builder.number_constant(1.0).unwrap(), one);
        let zero = builder.number_constant(0.0).unwrap();
        let negative_zero = builder.number_constant(-0.0).unwrap();
        assert_ne!(zero, negative_zero);
        assert_eq!(builder.bytecode.constants.len(), 3);
    }

    #[test]
    fn test_constant_pool_limit() {
        let mut builder = BytecodeBuilder::new();
        for n in 0..=u16::MAX {
            builder.number_constant(f64::from(n)).unwrap();
        }
        assert!(matches!(
            builder.number_constant(65536.0),
            Err(Error::RangeError(m)) if m == "Too many constants"
        ));
        // Already pooled values still resolve.
        assert_eq!(builder.number_constant(7.0).unwrap(), 7);
    }

    #[test]
    fn test_local_limit() {
        let mut builder = BytecodeBuilder::new();
        for _ in 0..u16::MAX {
            builder.declare_local().unwrap();
        }
        assert!(matches!(builder.declare_local(), Err(Error::RangeError(_))));
    }
}
