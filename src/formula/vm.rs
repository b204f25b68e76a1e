//! Fuel-metered stack VM for compiled formulas.
//!
//! Every instruction costs fuel, and a handful of allocating operations
//! cost extra in proportion to the data they touch, so total work is
//! bounded by the fuel budget no matter what the formula does. A trap
//! aborts the run without unwinding the host.

use crate::board::Coord;
use crate::error::{Trap, VmResult};
use crate::formula::compiler::{Builtin, Op, Program};
use crate::formula::context::Snapshot;
use std::rc::Rc;

/// Hard cap on the value stack.
const MAX_STACK: usize = 4096;

/// Hard cap on call depth.
const MAX_CALL_DEPTH: usize = 64;

/// A runtime value.
///
/// Board objects are index handles into the snapshot, not references, so
/// values stay small and the snapshot stays immutable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Nil,
    Num(f64),
    Bool(bool),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Tile(u32),
    Cluster(u32),
    Network(u32),
    Context,
}

impl Value {
    pub(crate) const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Num(_) => "number",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Tile(_) => "tile",
            Self::Cluster(_) => "cluster",
            Self::Network(_) => "network",
            Self::Context => "context",
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub(crate) struct RunOutcome {
    /// The value returned by the entry point.
    pub(crate) value: Value,
    /// Coordinates the formula highlighted, in call order.
    pub(crate) highlights: Vec<Coord>,
    /// Fuel remaining when the entry point returned.
    pub(crate) fuel_left: u64,
}

struct Frame {
    func: usize,
    ip: usize,
    locals: Vec<Value>,
}

struct Vm<'a> {
    program: &'a Program,
    snapshot: &'a Snapshot,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    fuel: u64,
    highlights: Vec<Coord>,
}

/// Run the program's entry point against a board snapshot.
///
/// # Errors
///
/// Returns the trap that aborted execution, including fuel exhaustion.
pub(crate) fn run(program: &Program, snapshot: &Snapshot, fuel: u64) -> VmResult<RunOutcome> {
    let mut vm = Vm {
        program,
        snapshot,
        stack: Vec::with_capacity(64),
        frames: Vec::with_capacity(8),
        fuel,
        highlights: Vec::new(),
    };
    vm.push(Value::Context)?;
    vm.enter(program.entry, 1)?;
    let value = vm.run_loop()?;
    Ok(RunOutcome {
        value,
        highlights: vm.highlights,
        fuel_left: vm.fuel,
    })
}

impl Vm<'_> {
    fn spend(&mut self, cost: u64) -> VmResult<()> {
        if self.fuel < cost {
            self.fuel = 0;
            return Err(Trap::FuelExhausted);
        }
        self.fuel -= cost;
        Ok(())
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= MAX_STACK {
            return Err(Trap::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(Trap::StackUnderflow)
    }

    fn pop_num(&mut self) -> VmResult<f64> {
        match self.pop()? {
            Value::Num(n) => Ok(n),
            other => Err(Trap::TypeError(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    fn pop_bool(&mut self) -> VmResult<bool> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(Trap::TypeError(format!(
                "condition must be a bool, got {}",
                other.type_name()
            ))),
        }
    }

    fn pop_list(&mut self) -> VmResult<Rc<Vec<Value>>> {
        match self.pop()? {
            Value::List(items) => Ok(items),
            other => Err(Trap::TypeError(format!(
                "expected a list, got {}",
                other.type_name()
            ))),
        }
    }

    fn enter(&mut self, func: usize, argc: u8) -> VmResult<()> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(Trap::StackOverflow);
        }
        let code = &self.program.funcs[func];
        if argc != code.arity {
            return Err(Trap::Arity {
                name: code.name.clone(),
                expected: code.arity,
                got: argc,
            });
        }
        let mut locals = vec![Value::Nil; code.locals as usize];
        // Arguments were pushed left to right; pop them into parameter slots.
        for slot in (0..argc as usize).rev() {
            locals[slot] = self.pop()?;
        }
        self.frames.push(Frame {
            func,
            ip: 0,
            locals,
        });
        Ok(())
    }

    fn string(&self, id: u16) -> &str {
        &self.program.strings[id as usize]
    }

    #[allow(clippy::too_many_lines)]
    fn run_loop(&mut self) -> VmResult<Value> {
        loop {
            self.spend(1)?;
            let frame = self.frames.last_mut().ok_or(Trap::StackUnderflow)?;
            let func = frame.func;
            let ip = frame.ip;
            frame.ip += 1;
            let op = self.program.funcs[func].code[ip];
            match op {
                Op::Num(n) => self.push(Value::Num(n))?,
                Op::Str(id) => {
                    let text: Rc<str> = Rc::from(self.string(id));
                    self.push(Value::Str(text))?;
                }
                Op::True => self.push(Value::Bool(true))?,
                Op::False => self.push(Value::Bool(false))?,
                Op::Nil => self.push(Value::Nil)?,
                Op::Load(slot) => {
                    let value = self
                        .frames
                        .last()
                        .and_then(|f| f.locals.get(slot as usize))
                        .cloned()
                        .ok_or(Trap::Undefined(format!("local slot {slot}")))?;
                    self.push(value)?;
                }
                Op::Store(slot) => {
                    let value = self.pop()?;
                    let frame = self.frames.last_mut().ok_or(Trap::StackUnderflow)?;
                    let cell = frame
                        .locals
                        .get_mut(slot as usize)
                        .ok_or(Trap::Undefined(format!("local slot {slot}")))?;
                    *cell = value;
                }
                Op::Pop => {
                    self.pop()?;
                }
                Op::Add => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    match (lhs, rhs) {
                        (Value::Num(a), Value::Num(b)) => self.push(Value::Num(a + b))?,
                        (Value::Str(a), Value::Str(b)) => {
                            self.spend(1 + (a.len() + b.len()) as u64 / 16)?;
                            let joined: Rc<str> = Rc::from(format!("{a}{b}"));
                            self.push(Value::Str(joined))?;
                        }
                        (Value::List(a), Value::List(b)) => {
                            self.spend((a.len() + b.len()) as u64)?;
                            let mut joined = Vec::with_capacity(a.len() + b.len());
                            joined.extend(a.iter().cloned());
                            joined.extend(b.iter().cloned());
                            self.push(Value::List(Rc::new(joined)))?;
                        }
                        (lhs, rhs) => {
                            return Err(Trap::TypeError(format!(
                                "cannot add {} and {}",
                                lhs.type_name(),
                                rhs.type_name()
                            )));
                        }
                    }
                }
                Op::Sub => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Num(lhs - rhs))?;
                }
                Op::Mul => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Num(lhs * rhs))?;
                }
                Op::Div => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    if rhs == 0.0 {
                        return Err(Trap::DivisionByZero);
                    }
                    self.push(Value::Num(lhs / rhs))?;
                }
                Op::Rem => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    if rhs == 0.0 {
                        return Err(Trap::DivisionByZero);
                    }
                    self.push(Value::Num(lhs % rhs))?;
                }
                Op::Neg => {
                    let value = self.pop_num()?;
                    self.push(Value::Num(-value))?;
                }
                Op::Not => {
                    let value = self.pop_bool()?;
                    self.push(Value::Bool(!value))?;
                }
                Op::Eq => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(Value::Bool(values_equal(&lhs, &rhs)))?;
                }
                Op::Ne => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(Value::Bool(!values_equal(&lhs, &rhs)))?;
                }
                Op::Lt => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Bool(lhs < rhs))?;
                }
                Op::Le => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Bool(lhs <= rhs))?;
                }
                Op::Gt => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Bool(lhs > rhs))?;
                }
                Op::Ge => {
                    let rhs = self.pop_num()?;
                    let lhs = self.pop_num()?;
                    self.push(Value::Bool(lhs >= rhs))?;
                }
                Op::Jump(target) => {
                    self.frames.last_mut().ok_or(Trap::StackUnderflow)?.ip = target as usize;
                }
                Op::JumpIfFalse(target) => {
                    if !self.pop_bool()? {
                        self.frames.last_mut().ok_or(Trap::StackUnderflow)?.ip = target as usize;
                    }
                }
                Op::JumpIfTruePeek(target) => {
                    let top = self.stack.last().ok_or(Trap::StackUnderflow)?;
                    let Value::Bool(b) = top else {
                        return Err(Trap::TypeError(format!(
                            "condition must be a bool, got {}",
                            top.type_name()
                        )));
                    };
                    if *b {
                        self.frames.last_mut().ok_or(Trap::StackUnderflow)?.ip = target as usize;
                    }
                }
                Op::JumpIfFalsePeek(target) => {
                    let top = self.stack.last().ok_or(Trap::StackUnderflow)?;
                    let Value::Bool(b) = top else {
                        return Err(Trap::TypeError(format!(
                            "condition must be a bool, got {}",
                            top.type_name()
                        )));
                    };
                    if !*b {
                        self.frames.last_mut().ok_or(Trap::StackUnderflow)?.ip = target as usize;
                    }
                }
                Op::Call { func, argc } => {
                    self.enter(func as usize, argc)?;
                }
                Op::CallBuiltin { builtin, argc } => {
                    debug_assert_eq!(argc, builtin.arity());
                    self.call_builtin(builtin)?;
                }
                Op::CallMethod { name, argc } => {
                    self.call_method(name, argc)?;
                }
                Op::Field(name) => {
                    self.read_field(name)?;
                }
                Op::Index => {
                    let index = self.pop_num()?;
                    let list = self.pop_list()?;
                    let element = index_list(&list, index)?;
                    self.push(element)?;
                }
                Op::Len => {
                    let list = self.pop_list()?;
                    #[allow(clippy::cast_precision_loss)]
                    self.push(Value::Num(list.len() as f64))?;
                }
                Op::MakeList(count) => {
                    self.spend(u64::from(count))?;
                    let count = count as usize;
                    if self.stack.len() < count {
                        return Err(Trap::StackOverflow);
                    }
                    let items = self.stack.split_off(self.stack.len() - count);
                    self.push(Value::List(Rc::new(items)))?;
                }
                Op::Return => {
                    let value = self.pop()?;
                    self.frames.pop();
                    if self.frames.is_empty() {
                        return Ok(value);
                    }
                    self.push(value)?;
                }
            }
        }
    }

    fn call_builtin(&mut self, builtin: Builtin) -> VmResult<()> {
        let result = match builtin {
            Builtin::Sum => {
                let list = self.pop_list()?;
                self.spend(list.len() as u64)?;
                let mut total = 0.0;
                for item in list.iter() {
                    let Value::Num(n) = item else {
                        return Err(Trap::TypeError(format!(
                            "sum expects numbers, got {}",
                            item.type_name()
                        )));
                    };
                    total += n;
                }
                total
            }
            Builtin::Min | Builtin::Max => {
                let list = self.pop_list()?;
                self.spend(list.len() as u64)?;
                let mut best: Option<f64> = None;
                for item in list.iter() {
                    let Value::Num(n) = item else {
                        return Err(Trap::TypeError(format!(
                            "{} expects numbers, got {}",
                            builtin.name(),
                            item.type_name()
                        )));
                    };
                    best = Some(match best {
                        None => *n,
                        Some(b) if builtin == Builtin::Min => b.min(*n),
                        Some(b) => b.max(*n),
                    });
                }
                best.unwrap_or(0.0)
            }
            Builtin::Count => {
                let list = self.pop_list()?;
                #[allow(clippy::cast_precision_loss)]
                let len = list.len() as f64;
                len
            }
            Builtin::Abs => self.pop_num()?.abs(),
            Builtin::Floor => self.pop_num()?.floor(),
        };
        self.push(Value::Num(result))
    }

    fn tile_list(&mut self, handles: &[u32]) -> VmResult<Value> {
        self.spend(handles.len() as u64)?;
        Ok(Value::List(Rc::new(
            handles.iter().map(|&h| Value::Tile(h)).collect(),
        )))
    }

    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    fn call_method(&mut self, name: u16, argc: u8) -> VmResult<()> {
        let name = self.string(name).to_string();
        let mut args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(self.pop()?);
        }
        args.reverse();
        let recv = self.pop()?;

        let Value::Context = recv else {
            return Err(Trap::TypeError(format!(
                "no method '{name}' on {}",
                recv.type_name()
            )));
        };

        let check_arity = |expected: u8| -> VmResult<()> {
            if argc == expected {
                Ok(())
            } else {
                Err(Trap::Arity {
                    name: name.clone(),
                    expected,
                    got: argc,
                })
            }
        };

        let result = match name.as_str() {
            "tileAt" => {
                check_arity(2)?;
                let x = num_arg(&args[0], "tileAt")?;
                let y = num_arg(&args[1], "tileAt")?;
                let coord = Coord::new(x as i32, y as i32);
                match self.snapshot.tile_at(coord) {
                    Some(handle) => Value::Tile(handle),
                    None => Value::Nil,
                }
            }
            "tiles" => {
                check_arity(0)?;
                let handles: Vec<u32> = self.snapshot.tile_handles().collect();
                self.tile_list(&handles)?
            }
            "neighbors" => {
                check_arity(1)?;
                let Value::Tile(handle) = args[0] else {
                    return Err(Trap::TypeError(format!(
                        "neighbors expects a tile, got {}",
                        args[0].type_name()
                    )));
                };
                let handles = self.snapshot.neighbors(handle);
                self.tile_list(&handles)?
            }
            "clusters" => {
                check_arity(0)?;
                self.spend(self.snapshot.cluster_count() as u64)?;
                Value::List(Rc::new(
                    (0..self.snapshot.cluster_count() as u32)
                        .map(Value::Cluster)
                        .collect(),
                ))
            }
            "clustersOf" => {
                check_arity(1)?;
                let Value::Str(zone) = &args[0] else {
                    return Err(Trap::TypeError(format!(
                        "clustersOf expects a zone name, got {}",
                        args[0].type_name()
                    )));
                };
                self.spend(self.snapshot.cluster_count() as u64)?;
                Value::List(Rc::new(
                    (0..self.snapshot.cluster_count() as u32)
                        .filter(|&h| {
                            self.snapshot
                                .cluster(h)
                                .is_some_and(|c| c.zone.as_str() == zone.as_ref())
                        })
                        .map(Value::Cluster)
                        .collect(),
                ))
            }
            "networks" => {
                check_arity(0)?;
                self.spend(self.snapshot.network_count() as u64)?;
                Value::List(Rc::new(
                    (0..self.snapshot.network_count() as u32)
                        .map(Value::Network)
                        .collect(),
                ))
            }
            "distance" => {
                check_arity(2)?;
                let a = tile_arg(&args[0], "distance")?;
                let b = tile_arg(&args[1], "distance")?;
                let a = self.resolve_tile(a)?;
                let b = self.resolve_tile(b)?;
                Value::Num(f64::from(a.distance(b)))
            }
            "adjacent" => {
                check_arity(2)?;
                let a = tile_arg(&args[0], "adjacent")?;
                let b = tile_arg(&args[1], "adjacent")?;
                let a = self.resolve_tile(a)?;
                let b = self.resolve_tile(b)?;
                Value::Bool(a.is_adjacent(b))
            }
            "highlight" => {
                check_arity(1)?;
                let Value::List(items) = &args[0] else {
                    return Err(Trap::TypeError(format!(
                        "highlight expects a list of tiles, got {}",
                        args[0].type_name()
                    )));
                };
                self.spend(items.len() as u64)?;
                for item in items.iter() {
                    let handle = tile_arg(item, "highlight")?;
                    let coord = self.resolve_tile(handle)?;
                    self.highlights.push(coord);
                }
                Value::Nil
            }
            _ => return Err(Trap::Undefined(format!("method '{name}'"))),
        };
        self.push(result)
    }

    fn resolve_tile(&self, handle: u32) -> VmResult<Coord> {
        self.snapshot
            .tile(handle)
            .map(|t| t.coord)
            .ok_or_else(|| Trap::Undefined(format!("tile handle {handle}")))
    }

    fn read_field(&mut self, name: u16) -> VmResult<()> {
        let name = self.string(name).to_string();
        let recv = self.pop()?;
        let value = match (&recv, name.as_str()) {
            (Value::Tile(handle), _) => {
                let tile = self
                    .snapshot
                    .tile(*handle)
                    .ok_or_else(|| Trap::Undefined(format!("tile handle {handle}")))?;
                match name.as_str() {
                    "x" => Value::Num(f64::from(tile.coord.x)),
                    "y" => Value::Num(f64::from(tile.coord.y)),
                    "zone" => Value::Str(Rc::from(tile.zone.as_str())),
                    "roadCount" => {
                        #[allow(clippy::cast_precision_loss)]
                        let count = tile.roads.len() as f64;
                        Value::Num(count)
                    }
                    _ => return Err(Trap::Undefined(format!("tile field '{name}'"))),
                }
            }
            (Value::Cluster(handle), _) => {
                let cluster = self
                    .snapshot
                    .cluster(*handle)
                    .ok_or_else(|| Trap::Undefined(format!("cluster handle {handle}")))?;
                match name.as_str() {
                    "zone" => Value::Str(Rc::from(cluster.zone.as_str())),
                    "size" => {
                        #[allow(clippy::cast_precision_loss)]
                        let size = cluster.tiles.len() as f64;
                        Value::Num(size)
                    }
                    "tiles" => {
                        let handles = cluster.tiles.clone();
                        self.tile_list(&handles)?
                    }
                    _ => return Err(Trap::Undefined(format!("cluster field '{name}'"))),
                }
            }
            (Value::Network(handle), _) => {
                let network = self
                    .snapshot
                    .network(*handle)
                    .ok_or_else(|| Trap::Undefined(format!("network handle {handle}")))?;
                match name.as_str() {
                    "size" => {
                        #[allow(clippy::cast_precision_loss)]
                        let size = network.segments as f64;
                        Value::Num(size)
                    }
                    "tiles" => {
                        let handles = network.tiles.clone();
                        self.tile_list(&handles)?
                    }
                    _ => return Err(Trap::Undefined(format!("network field '{name}'"))),
                }
            }
            _ => {
                return Err(Trap::TypeError(format!(
                    "no field '{name}' on {}",
                    recv.type_name()
                )));
            }
        };
        self.push(value)
    }
}

fn num_arg(value: &Value, method: &str) -> VmResult<f64> {
    match value {
        Value::Num(n) => Ok(*n),
        other => Err(Trap::TypeError(format!(
            "{method} expects numbers, got {}",
            other.type_name()
        ))),
    }
}

fn tile_arg(value: &Value, method: &str) -> VmResult<u32> {
    match value {
        Value::Tile(handle) => Ok(*handle),
        other => Err(Trap::TypeError(format!(
            "{method} expects tiles, got {}",
            other.type_name()
        ))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_list(list: &[Value], index: f64) -> VmResult<Value> {
    let raw = index as i64;
    if raw < 0 || (raw as usize) >= list.len() {
        return Err(Trap::IndexOutOfRange {
            index: raw,
            len: list.len(),
        });
    }
    Ok(list[raw as usize].clone())
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Nil, Value::Nil) | (Value::Context, Value::Context) => true,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Tile(a), Value::Tile(b))
        | (Value::Cluster(a), Value::Cluster(b))
        | (Value::Network(a), Value::Network(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::board::{Card, CardId, ZoneType};
    use crate::formula::compiler::{compile_formula, DEFAULT_MAX_OPS};

    fn snapshot() -> Snapshot {
        let cards = vec![
            Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
            Card::uniform(CardId(2), 2, 0, &ZoneType::park()),
        ];
        Snapshot::from_analysis(&analyze(&cards))
    }

    fn eval(source: &str, fuel: u64) -> VmResult<Value> {
        let compiled = compile_formula(source, DEFAULT_MAX_OPS);
        let program = compiled.program.expect("compile failed");
        run(&program, &snapshot(), fuel).map(|o| o.value)
    }

    fn eval_num(source: &str) -> f64 {
        match eval(source, 100_000) {
            Ok(Value::Num(n)) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_num("fn calculateScore(ctx) { return 2 + 3 * 4; }"), 14.0);
        assert_eq!(eval_num("fn calculateScore(ctx) { return (2 + 3) * 4; }"), 20.0);
        assert_eq!(eval_num("fn calculateScore(ctx) { return 7 % 4; }"), 3.0);
        assert_eq!(eval_num("fn calculateScore(ctx) { return -5 + 1; }"), -4.0);
    }

    #[test]
    fn test_division_by_zero_traps() {
        assert_eq!(
            eval("fn calculateScore(ctx) { return 1 / 0; }", 1_000),
            Err(Trap::DivisionByZero)
        );
    }

    #[test]
    fn test_control_flow_and_locals() {
        let src = "fn calculateScore(ctx) {
            let total = 0;
            let i = 0;
            while i < 5 { total = total + i; i = i + 1; }
            if total > 100 { return 0; } else { return total; }
        }";
        assert_eq!(eval_num(src), 10.0);
    }

    #[test]
    fn test_for_over_list_literal() {
        let src = "fn calculateScore(ctx) {
            let total = 0;
            for n in [1, 2, 3, 4] { total = total + n; }
            return total;
        }";
        assert_eq!(eval_num(src), 10.0);
    }

    #[test]
    fn test_user_function_calls() {
        let src = "fn double(n) { return n * 2; }
                   fn calculateScore(ctx) { return double(double(3)); }";
        assert_eq!(eval_num(src), 12.0);
    }

    #[test]
    fn test_infinite_loop_exhausts_fuel() {
        let src = "fn calculateScore(ctx) { while true { } return 0; }";
        assert_eq!(eval(src, 10_000), Err(Trap::FuelExhausted));
    }

    #[test]
    fn test_unbounded_recursion_overflows() {
        let src = "fn f(n) { return f(n + 1); }
                   fn calculateScore(ctx) { return f(0); }";
        assert_eq!(eval(src, 1_000_000), Err(Trap::StackOverflow));
    }

    #[test]
    fn test_empty_stack_pop_reports_underflow_not_overflow() {
        use crate::formula::compiler::FuncCode;
        // A hand-built program popping a value that was never pushed. The
        // lowerer never emits this; the trap must still be distinguishable
        // from a formula recursing too deep.
        let program = Program {
            funcs: vec![FuncCode {
                name: "calculateScore".to_string(),
                arity: 1,
                locals: 1,
                code: vec![Op::Pop, Op::Nil, Op::Return],
            }],
            entry: 0,
            strings: vec![],
        };
        let outcome = run(&program, &snapshot(), 1_000);
        assert_eq!(outcome.map(|o| o.value), Err(Trap::StackUnderflow));
    }

    #[test]
    fn test_non_bool_condition_traps() {
        let src = "fn calculateScore(ctx) { if 1 { return 2; } return 0; }";
        assert!(matches!(eval(src, 1_000), Err(Trap::TypeError(_))));
    }

    #[test]
    fn test_short_circuit() {
        // The right operand would trap; short-circuit must skip it.
        let src = "fn boom() { return 1 / 0; }
                   fn calculateScore(ctx) {
                       if false && boom() == 1 { return 1; }
                       if true || boom() == 1 { return 2; }
                       return 0;
                   }";
        assert_eq!(eval_num(src), 2.0);
    }

    #[test]
    fn test_context_tiles_and_zones() {
        let src = r#"fn calculateScore(ctx) {
            let parks = 0;
            for t in ctx.tiles() {
                if t.zone == "park" { parks = parks + 1; }
            }
            return parks;
        }"#;
        assert_eq!(eval_num(src), 4.0);
    }

    #[test]
    fn test_context_clusters_of() {
        let src = r#"fn calculateScore(ctx) {
            let best = 0;
            for c in ctx.clustersOf("residential") {
                if c.size > best { best = c.size; }
            }
            return best;
        }"#;
        assert_eq!(eval_num(src), 4.0);
    }

    #[test]
    fn test_tile_at_and_distance() {
        let src = "fn calculateScore(ctx) {
            let a = ctx.tileAt(0, 0);
            let b = ctx.tileAt(3, 1);
            if a == nil { return -1; }
            return ctx.distance(a, b);
        }";
        assert_eq!(eval_num(src), 4.0);
    }

    #[test]
    fn test_tile_at_empty_cell_is_nil() {
        let src = "fn calculateScore(ctx) {
            if ctx.tileAt(50, 50) == nil { return 1; }
            return 0;
        }";
        assert_eq!(eval_num(src), 1.0);
    }

    #[test]
    fn test_highlight_records_coords() {
        let src = r#"fn calculateScore(ctx) {
            let picked = [];
            for t in ctx.tiles() {
                if t.zone == "park" { ctx.highlight([t]); }
            }
            return 0;
        }"#;
        let compiled = compile_formula(src, DEFAULT_MAX_OPS);
        let program = compiled.program.expect("compile failed");
        let outcome = run(&program, &snapshot(), 100_000).expect("run failed");
        assert_eq!(outcome.highlights.len(), 4);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(
            eval_num("fn calculateScore(ctx) { return sum([1, 2, 3]); }"),
            6.0
        );
        assert_eq!(
            eval_num("fn calculateScore(ctx) { return max([1, 9, 3]); }"),
            9.0
        );
        assert_eq!(
            eval_num("fn calculateScore(ctx) { return min([4, 2, 3]); }"),
            2.0
        );
        assert_eq!(
            eval_num("fn calculateScore(ctx) { return count([4, 2]); }"),
            2.0
        );
        assert_eq!(eval_num("fn calculateScore(ctx) { return abs(0 - 7); }"), 7.0);
        assert_eq!(eval_num("fn calculateScore(ctx) { return floor(3.9); }"), 3.0);
    }

    #[test]
    fn test_list_concat() {
        let src = "fn calculateScore(ctx) { let l = [1] + [2, 3]; return count(l) + l[2]; }";
        assert_eq!(eval_num(src), 6.0);
    }

    #[test]
    fn test_list_index_out_of_range_traps() {
        let src = "fn calculateScore(ctx) { let l = [1, 2]; return l[5]; }";
        assert!(matches!(
            eval(src, 1_000),
            Err(Trap::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_unknown_method_traps() {
        let src = "fn calculateScore(ctx) { return ctx.everything(); }";
        assert!(matches!(eval(src, 1_000), Err(Trap::Undefined(_))));
    }

    #[test]
    fn test_determinism() {
        let src = r#"fn calculateScore(ctx) {
            let total = 0;
            for c in ctx.clusters() { total = total + c.size * 10; }
            for n in ctx.networks() { total = total - n.size; }
            return total;
        }"#;
        let first = eval_num(src);
        for _ in 0..5 {
            assert!((eval_num(src) - first).abs() < f64::EPSILON);
        }
    }
}
