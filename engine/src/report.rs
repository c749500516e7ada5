//! Utilities for structured reporting of experimental results.
//!
//! Values are reported within contexts which nest like the program flow
//! and everything is printed as one JSON object when the `ReportingGuard` is dropped.
//! The reporter is thread local. Only the thread which called `enable_reporting`
//! collects anything, reports from other threads go nowhere.
//! For the simulation that is the consumer side of the experiment pipeline.

use serde_json::{Map, Value};
use std::{cell::RefCell, mem::swap};

pub use serde_json::json;

#[derive(Debug)]
enum ContextStackItem {
    Key(String),
    Collection(Vec<Value>),
    Object(Map<String, Value>),
}

#[derive(Debug)]
enum CurrentReportingContext {
    Collection(Vec<Value>),
    Object(Map<String, Value>),
}

#[derive(Debug)]
pub struct Reporter {
    current: CurrentReportingContext,
    context_stack: Vec<ContextStackItem>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter {
            current: CurrentReportingContext::Object(Map::new()),
            context_stack: Vec::new(),
        }
    }
}

impl Reporter {
    fn create_object_under_key(&mut self, key: String) {
        match &mut self.current {
            CurrentReportingContext::Object(object) => {
                let mut tmp = Map::new();
                swap(&mut tmp, object);
                self.context_stack.push(ContextStackItem::Object(tmp));
                self.context_stack.push(ContextStackItem::Key(key));
            }
            CurrentReportingContext::Collection(_) => {
                panic!("Cannot create object at key in collection");
            }
        }
    }

    fn create_collection_under_key(&mut self, key: String) {
        match &mut self.current {
            CurrentReportingContext::Object(object) => {
                let mut tmp = Map::new();
                swap(&mut tmp, object);
                self.context_stack.push(ContextStackItem::Object(tmp));
                self.context_stack.push(ContextStackItem::Key(key));
                self.current = CurrentReportingContext::Collection(Vec::new());
            }
            CurrentReportingContext::Collection(_) => {
                panic!("Cannot create collection at key in collection");
            }
        }
    }

    fn create_collection_item(&mut self) {
        match &mut self.current {
            CurrentReportingContext::Object(_) => {
                panic!("Cannot create collection item in object");
            }
            CurrentReportingContext::Collection(collection) => {
                let mut tmp = Vec::new();
                swap(&mut tmp, collection);
                self.context_stack.push(ContextStackItem::Collection(tmp));
                self.current = CurrentReportingContext::Object(Map::new());
            }
        }
    }

    fn report(&mut self, key: String, val: Value) {
        match &mut self.current {
            CurrentReportingContext::Object(object) => {
                let prev = object.insert(key, val);
                if !cfg!(feature = "report-allow-override") {
                    assert!(prev.is_none());
                }
            }
            CurrentReportingContext::Collection(_) => {
                panic!("Cannot report value on collection");
            }
        }
    }

    fn pop_context(&mut self) {
        let current = std::mem::replace(&mut self.current, CurrentReportingContext::Object(Map::new()));
        let finished = match current {
            CurrentReportingContext::Object(object) => Value::Object(object),
            CurrentReportingContext::Collection(collection) => Value::Array(collection),
        };

        match self.context_stack.pop() {
            Some(ContextStackItem::Key(key)) => match self.context_stack.pop() {
                Some(ContextStackItem::Object(mut object)) => {
                    let prev = object.insert(key, finished);
                    assert_eq!(prev, None);
                    self.current = CurrentReportingContext::Object(object);
                }
                _ => panic!("Inconsistent context stack"),
            },
            Some(ContextStackItem::Collection(mut collection)) => {
                collection.push(finished);
                self.current = CurrentReportingContext::Collection(collection);
            }
            Some(ContextStackItem::Object(_)) | None => panic!("Inconsistent context stack"),
        }
    }

    fn into_value(mut self) -> Value {
        assert!(self.context_stack.is_empty());
        match std::mem::replace(&mut self.current, CurrentReportingContext::Object(Map::new())) {
            CurrentReportingContext::Object(object) => Value::Object(object),
            CurrentReportingContext::Collection(_) => panic!("broken root object for reporting"),
        }
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = RefCell::new(None);
}

#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(Reporter::pop_context));
    }
}

pub fn push_context(key: String) -> ContextGuard {
    REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(|r| r.create_object_under_key(key)));
    ContextGuard(())
}

#[must_use]
pub struct CollectionContextGuard(());

impl Drop for CollectionContextGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(Reporter::pop_context));
    }
}

pub fn push_collection_context(key: String) -> CollectionContextGuard {
    REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(|r| r.create_collection_under_key(key)));
    CollectionContextGuard(())
}

impl CollectionContextGuard {
    pub fn push_collection_item(&mut self) -> CollectionItemContextGuard {
        REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(Reporter::create_collection_item));
        CollectionItemContextGuard(self)
    }
}

#[must_use]
pub struct CollectionItemContextGuard<'a>(&'a CollectionContextGuard);

impl<'a> Drop for CollectionItemContextGuard<'a> {
    fn drop(&mut self) {
        REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(Reporter::pop_context));
    }
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    REPORTER.with(|reporter| reporter.borrow_mut().as_mut().map(|r| r.report(key, val)));
}

/// Everything reported so far on this thread, `None` if reporting is not enabled here.
pub fn current_report() -> Option<Value> {
    REPORTER.with(|reporter| {
        reporter.borrow().as_ref().map(|r| match &r.current {
            CurrentReportingContext::Object(object) => Value::Object(object.clone()),
            CurrentReportingContext::Collection(collection) => Value::Array(collection.clone()),
        })
    })
}

#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        if let Some(reporter) = REPORTER.with(|reporter| reporter.borrow_mut().take()) {
            println!("{}", reporter.into_value());
        }
    }
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { report($k.to_string(), json!($($json)+)) };
}

pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));

    report!("program", program);
    report!("version", env!("CARGO_PKG_VERSION"));
    report!("feature_flags", enabled_features());

    if let Ok(hostname) = std::process::Command::new("hostname").output() {
        report!("hostname", String::from_utf8_lossy(&hostname.stdout).trim());
    }

    if let Ok(since_epoch) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        report!("start_time_unix_s", since_epoch.as_secs());
    }
    report!("args", std::env::args().collect::<Vec<String>>());

    ReportingGuard(())
}

fn enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "report-to-stderr") {
        features.push("report-to-stderr");
    }
    if cfg!(feature = "report-allow-override") {
        features.push("report-allow-override");
    }
    features
}

pub mod benchmark;
pub use benchmark::*;
