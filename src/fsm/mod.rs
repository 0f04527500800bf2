//! Function-pointer finite state machine engine for the tap sequencer.
//!
//! Classic embedded FSM pattern expressed in safe Rust:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌─────────────────┬───────────┬──────────┬─────────────────┐  │
//! │  │ Operation       │ on_enter  │ on_exit  │ on_update       │  │
//! │  ├─────────────────┼───────────┼──────────┼─────────────────┤  │
//! │  │ Idle            │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ MovingToMiddle  │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ MovingToCard1/2 │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ TappingCard1/2  │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ ManualOperation │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  └─────────────────┴───────────┴──────────┴─────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** operation.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! operation, then `on_enter` for the next, and moves the pointer.  Every
//! handler receives `&mut MotorContext`, whose `now` the caller sets
//! before invoking the engine.

pub mod context;
pub mod states;

use context::MotorContext;
use log::info;

// ---------------------------------------------------------------------------
// Operation identity
// ---------------------------------------------------------------------------

/// The sequencer's active operation.  Exactly one at a time.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    Idle = 0,
    MovingToMiddle = 1,
    MovingToCard1 = 2,
    MovingToCard2 = 3,
    TappingCard1 = 4,
    TappingCard2 = 5,
    ManualOperation = 6,
}

impl Operation {
    /// Total number of operations, used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert a table index back to `Operation`.  Out-of-range indices
    /// assert in debug builds and fall back to `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::MovingToMiddle,
            2 => Self::MovingToCard1,
            3 => Self::MovingToCard2,
            4 => Self::TappingCard1,
            5 => Self::TappingCard2,
            6 => Self::ManualOperation,
            _ => {
                debug_assert!(false, "invalid operation index: {idx}");
                Self::Idle
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MovingToMiddle => "moving_to_middle",
            Self::MovingToCard1 => "moving_to_card1",
            Self::MovingToCard2 => "moving_to_card2",
            Self::TappingCard1 => "tapping_card1",
            Self::TappingCard2 => "tapping_card2",
            Self::ManualOperation => "manual_operation",
        }
    }

    /// Operations during which the rod is travelling on a timed budget.
    pub const fn is_motion_phase(self) -> bool {
        matches!(
            self,
            Self::MovingToMiddle | Self::MovingToCard1 | Self::MovingToCard2
        )
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each transition.
pub type StateActionFn = fn(&mut MotorContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut MotorContext) -> Option<Operation>;

/// Static descriptor for a single operation.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: Operation,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `Operation as usize`.
    table: [StateDescriptor; Operation::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; Operation::COUNT], initial: Operation) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter`.  Call once, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut MotorContext) {
        info!("FSM starting in operation: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick: run `on_update` and follow the returned edge.
    pub fn tick(&mut self, ctx: &mut MotorContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Jump to `next` immediately (command entry points, force-complete).
    /// A request for the current operation is ignored.
    pub fn force_transition(&mut self, next: Operation, ctx: &mut MotorContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current(&self) -> Operation {
        Operation::from_index(self.current)
    }

    fn transition(&mut self, next_id: Operation, ctx: &mut MotorContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
