//! NSTimer-driven frame loop
//!
//! NSTimer calls an Objective-C selector, so the Rust tick closure lives in
//! the ivars of a small target object that forwards `fire:` to it.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{class, define_class, msg_send, sel, DefinedClass, MainThreadMarker, MainThreadOnly, Message};
use objc2_foundation::{NSObject, NSObjectProtocol};
use tracing::trace;

use crate::native::RepeatingTimer;

struct TimerTargetIvars {
    tick: RefCell<Box<dyn FnMut()>>,
}

define_class! {
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "GameViewTimerTarget"]
    #[ivars = TimerTargetIvars]
    struct TimerTarget;

    unsafe impl NSObjectProtocol for TimerTarget {}

    impl TimerTarget {
        #[unsafe(method(fire:))]
        fn fire(&self, _timer: &AnyObject) {
            // The tick may invalidate the timer and drop the last owner of
            // this target, so hold a reference until it returns
            let _alive = self.retain();
            match self.ivars().tick.try_borrow_mut() {
                Ok(mut tick) => (*tick)(),
                Err(_) => trace!("Re-entrant timer tick dropped"),
            }
        }
    }
}

impl TimerTarget {
    fn new(tick: Box<dyn FnMut()>, mtm: MainThreadMarker) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(TimerTargetIvars {
            tick: RefCell::new(tick),
        });
        // SAFETY: NSObject's init is always safe.
        unsafe { msg_send![super(this), init] }
    }
}

/// A repeating NSTimer on the main run loop
pub struct NsTimer {
    raw: Retained<AnyObject>,
    _target: Retained<TimerTarget>,
}

impl NsTimer {
    /// Schedule `tick` every `interval` on the current run loop
    pub fn schedule(interval: Duration, tick: Box<dyn FnMut()>, mtm: MainThreadMarker) -> Self {
        let target = TimerTarget::new(tick, mtm);
        let seconds = interval.as_secs_f64();

        // SAFETY: `fire:` is defined on the target above and takes the timer
        // as its only argument. The timer retains the target until it is
        // invalidated.
        let raw: Retained<AnyObject> = unsafe {
            msg_send![
                class!(NSTimer),
                scheduledTimerWithTimeInterval: seconds,
                target: &*target,
                selector: sel!(fire:),
                userInfo: None::<&AnyObject>,
                repeats: true
            ]
        };

        Self {
            raw,
            _target: target,
        }
    }
}

impl RepeatingTimer for NsTimer {
    fn invalidate(&self) {
        // SAFETY: invalidating an already-invalid timer is a no-op.
        unsafe {
            let _: () = msg_send![&*self.raw, invalidate];
        }
    }
}

impl Drop for NsTimer {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl fmt::Debug for NsTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: `isValid` has no preconditions.
        let valid: bool = unsafe { msg_send![&*self.raw, isValid] };
        f.debug_struct("NsTimer").field("valid", &valid).finish()
    }
}
