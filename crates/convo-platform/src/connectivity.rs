//! Online/offline awareness from the browser.
//!
//! Seeds from `navigator.onLine`, then tracks the window's online/offline
//! events. The controller registers itself as the single observer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;

use convo_core::ports::ConnectivityPort;
use convo_types::{Result, SessionError};

pub struct BrowserConnectivity {
    online: Rc<Cell<bool>>,
    observer: Rc<RefCell<Option<Box<dyn Fn(bool)>>>>,
}

impl BrowserConnectivity {
    /// Wire up the window listeners. The closures stay registered for the
    /// life of the page, so they are deliberately leaked.
    pub fn new() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| SessionError::JsInterop("no window object".to_string()))?;
        let online = Rc::new(Cell::new(window.navigator().on_line()));
        let observer: Rc<RefCell<Option<Box<dyn Fn(bool)>>>> = Rc::new(RefCell::new(None));

        for (event, is_online) in [("online", true), ("offline", false)] {
            let online = Rc::clone(&online);
            let observer = Rc::clone(&observer);
            let closure = Closure::wrap(Box::new(move || {
                online.set(is_online);
                if let Some(cb) = observer.borrow().as_ref() {
                    cb(is_online);
                }
            }) as Box<dyn FnMut()>);
            window
                .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
                .map_err(|e| SessionError::JsInterop(format!("{:?}", e)))?;
            closure.forget();
        }

        Ok(Self { online, observer })
    }
}

impl ConnectivityPort for BrowserConnectivity {
    fn is_online(&self) -> bool {
        self.online.get()
    }

    fn set_observer(&self, observer: Box<dyn Fn(bool)>) {
        *self.observer.borrow_mut() = Some(observer);
    }
}
