//! Dynamic SQL evaluation
//!
//! Walks a statement's tag tree against the request bag and produces the SQL
//! text plus the bound parameters in emission order. The tree itself is never
//! modified; loop bindings live on the walker's frame stack.

use std::mem;
use tracing::trace;

use super::conditions::{Bindings, ConditionEvaluator, Frame};
use super::context::{DbParameter, RequestContext};
use crate::core::{MapperError, MapperOptions, ParamBag, Result, Value};
use crate::mapping::TypeHandlerRegistry;
use crate::parser::{scan, Segment};
use crate::statement::{ParameterMap, Statement, StatementCatalog, Tag, Test, TrimMode, When};

pub struct TagEvaluator<'a> {
    catalog: &'a dyn StatementCatalog,
    options: &'a MapperOptions,
    handlers: &'a TypeHandlerRegistry,
}

impl<'a> TagEvaluator<'a> {
    pub fn new(
        catalog: &'a dyn StatementCatalog,
        options: &'a MapperOptions,
        handlers: &'a TypeHandlerRegistry,
    ) -> Self {
        Self { catalog, options, handlers }
    }

    /// Render `statement` for the request held by `ctx`
    pub fn evaluate(&self, statement: &Statement, ctx: &mut RequestContext) -> Result<()> {
        let label = statement.full_id();
        let at = Position {
            label: label.clone(),
            scope: &statement.scope,
            parameter_map: statement.parameter_map.as_deref(),
            depth: 0,
        };
        let mut walk = self.walk(&ctx.request);
        walk.tags(&statement.tags, &at)?;
        let Emitter { sql, params } = walk.out;

        trace!(statement = %label, sql = %sql, parameters = params.len(), "Evaluated statement");
        ctx.set_output(sql, params);
        Ok(())
    }

    /// Bind placeholders of literal SQL against the request bag
    pub fn bind_sql(&self, sql: &str, ctx: &mut RequestContext) -> Result<()> {
        let label = ctx.statement_key();
        let at = Position {
            label: label.clone(),
            scope: &ctx.scope,
            parameter_map: None,
            depth: 0,
        };
        let mut walk = self.walk(&ctx.request);
        walk.text(sql, &at)?;
        let Emitter { sql, params } = walk.out;

        trace!(statement = %label, sql = %sql, parameters = params.len(), "Bound literal SQL");
        ctx.set_output(sql, params);
        Ok(())
    }

    fn walk<'w>(&'w self, bag: &'w ParamBag) -> Walk<'w> {
        Walk {
            catalog: self.catalog,
            options: self.options,
            handlers: self.handlers,
            bag,
            frames: Vec::new(),
            out: Emitter::default(),
        }
    }
}

/// Statement currently being rendered
struct Position<'s> {
    label: String,
    scope: &'s str,
    parameter_map: Option<&'s ParameterMap>,
    depth: usize,
}

#[derive(Default)]
struct Emitter {
    sql: String,
    params: Vec<DbParameter>,
}

impl Emitter {
    /// Append text exactly as written
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Keep the next container output from running into the previous word
    fn separate(&mut self) {
        if self.sql.chars().last().is_some_and(|c| !(c.is_whitespace() || c == '(')) {
            self.sql.push(' ');
        }
    }

    /// Append a container token (`WHERE`, `SET`, a prepend) as its own word
    fn push_token(&mut self, token: &str) {
        let token = token.trim();
        if !token.is_empty() {
            self.separate();
            self.sql.push_str(token);
        }
    }

    /// First binding of a name wins
    fn bind(&mut self, name: &str, value: Value) {
        if !self.params.iter().any(|p| p.name == name) {
            self.params.push(DbParameter {
                name: name.to_string(),
                value,
            });
        }
    }
}

struct Walk<'a> {
    catalog: &'a dyn StatementCatalog,
    options: &'a MapperOptions,
    handlers: &'a TypeHandlerRegistry,
    bag: &'a ParamBag,
    frames: Vec<Frame>,
    out: Emitter,
}

impl Walk<'_> {
    fn tags(&mut self, tags: &[Tag], at: &Position<'_>) -> Result<()> {
        for tag in tags {
            self.tag(tag, at)?;
        }
        Ok(())
    }

    fn tag(&mut self, tag: &Tag, at: &Position<'_>) -> Result<()> {
        match tag {
            Tag::Text { text } => self.text(text, at),
            Tag::Dynamic { prepend, required, trim, children } => {
                self.dynamic(prepend.as_deref(), *required, trim, children, at)
            }
            Tag::Condition { test, prepend, children } => {
                if self.test(test, at)? {
                    self.prepended(prepend.as_deref(), children, at)?;
                }
                Ok(())
            }
            Tag::Foreach { collection, item, index, open, close, separator, children } => {
                self.foreach(collection, item, index.as_deref(), [open, separator, close], children, at)
            }
            Tag::Include { scope, ref_id } => self.include(scope.as_deref(), ref_id, at),
            Tag::Choose { whens, otherwise } => self.choose(whens, otherwise.as_deref(), at),
            Tag::Placeholder { property, prepend } => {
                let bindings = Bindings { bag: self.bag, frames: &self.frames };
                let text = bindings
                    .resolve(property)
                    .filter(|v| !v.is_null())
                    .map(ToString::to_string);
                if let Some(text) = text {
                    if let Some(prepend) = prepend {
                        self.out.push_token(prepend);
                        self.out.separate();
                    }
                    self.out.push(&text);
                }
                Ok(())
            }
        }
    }

    fn test(&self, test: &Test, at: &Position<'_>) -> Result<bool> {
        let bindings = Bindings { bag: self.bag, frames: &self.frames };
        ConditionEvaluator::evaluate(test, &bindings, &at.label)
    }

    /// Render `children` into a scratch buffer and hand the text back
    fn render(&mut self, children: &[Tag], at: &Position<'_>) -> Result<String> {
        let outer = mem::take(&mut self.out.sql);
        let result = self.tags(children, at);
        let body = mem::replace(&mut self.out.sql, outer);
        result.map(|()| body)
    }

    fn prepended(&mut self, prepend: Option<&str>, children: &[Tag], at: &Position<'_>) -> Result<()> {
        let Some(token) = prepend else {
            return self.tags(children, at);
        };
        let body = self.render(children, at)?;
        if !body.trim().is_empty() {
            self.out.push_token(token);
            if !body.starts_with(char::is_whitespace) {
                self.out.separate();
            }
            self.out.push(&body);
        }
        Ok(())
    }

    fn text(&mut self, text: &str, at: &Position<'_>) -> Result<()> {
        let mut rendered = String::with_capacity(text.len());
        for segment in scan(text, &self.options.parameter_prefixes) {
            match segment {
                Segment::Text(literal) => rendered.push_str(literal),
                Segment::Param { prefix, name } => {
                    rendered.push(prefix);
                    match self.bind_placeholder(name, at)? {
                        Some(bound) => rendered.push_str(&bound),
                        // Unresolvable placeholders stay as written
                        None => rendered.push_str(name),
                    }
                }
            }
        }
        self.out.push(&rendered);
        Ok(())
    }

    /// Bind `name` and return the parameter name to emit
    fn bind_placeholder(&mut self, name: &str, at: &Position<'_>) -> Result<Option<String>> {
        let definition = at.parameter_map.and_then(|map| map.get(name));
        let path = definition
            .and_then(|def| def.property.as_deref())
            .unwrap_or(name);

        let bindings = Bindings { bag: self.bag, frames: &self.frames };
        let Some(value) = bindings.resolve(path) else {
            return Ok(None);
        };
        let value = match definition.and_then(|def| def.handler.as_deref()) {
            Some(handler) => self.handlers.named(handler)?.to_parameter(value)?,
            None => value.clone(),
        };

        let (root, rest) = match name.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (name, None),
        };
        let bound = match bindings.frame_for(root) {
            Some((frame, _)) => {
                let mut bound = root.to_string();
                for enclosing in &self.frames[..=frame] {
                    bound.push('_');
                    bound.push_str(&enclosing.position.to_string());
                }
                if let Some(rest) = rest {
                    bound.push('_');
                    bound.push_str(&rest.replace('.', "_"));
                }
                bound
            }
            None => name.to_string(),
        };

        self.out.bind(&bound, value);
        Ok(Some(bound))
    }

    fn dynamic(
        &mut self,
        prepend: Option<&str>,
        required: bool,
        trim: &TrimMode,
        children: &[Tag],
        at: &Position<'_>,
    ) -> Result<()> {
        let rendered = self.render(children, at)?;
        let mut body = rendered.trim();
        if body.is_empty() {
            return Ok(());
        }

        if required || matches!(trim, TrimMode::Where) {
            body = ["AND", "OR"]
                .iter()
                .find_map(|connector| strip_word_prefix(body, connector))
                .unwrap_or(body);
        }
        match trim {
            TrimMode::Set => {
                body = body.strip_suffix(',').map_or(body, str::trim_end);
            }
            TrimMode::Trim { prefix_overrides, suffix_overrides } => {
                body = prefix_overrides
                    .iter()
                    .find_map(|o| strip_word_prefix(body, o.trim()))
                    .unwrap_or(body);
                body = suffix_overrides
                    .iter()
                    .find_map(|o| strip_word_suffix(body, o.trim()))
                    .unwrap_or(body);
            }
            TrimMode::Plain | TrimMode::Where => {}
        }
        if body.is_empty() {
            return Ok(());
        }

        let token = prepend.or(match trim {
            TrimMode::Where => Some("WHERE"),
            TrimMode::Set => Some("SET"),
            _ => None,
        });
        if let Some(token) = token {
            self.out.push_token(token);
        }
        self.out.separate();
        self.out.push(body);
        Ok(())
    }

    fn foreach(
        &mut self,
        collection: &str,
        item: &str,
        index: Option<&str>,
        [open, separator, close]: [&String; 3],
        children: &[Tag],
        at: &Position<'_>,
    ) -> Result<()> {
        let bindings = Bindings { bag: self.bag, frames: &self.frames };
        let items = match bindings.resolve(collection) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::List(items)) => items.clone(),
            Some(_) => {
                return Err(MapperError::NotACollection {
                    statement: at.label.clone(),
                    path: collection.to_string(),
                });
            }
        };
        if items.is_empty() {
            return Ok(());
        }

        self.out.push(open);
        for (position, value) in items.into_iter().enumerate() {
            if position > 0 {
                self.out.push(separator);
            }
            self.frames.push(Frame::new(item, index, value, position));
            let result = self.tags(children, at);
            self.frames.pop();
            result?;
        }
        self.out.push(close);
        Ok(())
    }

    fn choose(&mut self, whens: &[When], otherwise: Option<&[Tag]>, at: &Position<'_>) -> Result<()> {
        for when in whens {
            if self.test(&when.test, at)? {
                return self.tags(&when.children, at);
            }
        }
        match otherwise {
            Some(children) => self.tags(children, at),
            None => Ok(()),
        }
    }

    fn include(&mut self, scope: Option<&str>, ref_id: &str, at: &Position<'_>) -> Result<()> {
        let scope = scope.unwrap_or(at.scope);
        let depth = at.depth + 1;
        if depth > self.options.max_include_depth {
            return Err(MapperError::IncludeDepthExceeded {
                statement: at.label.clone(),
                target: format!("{scope}.{ref_id}"),
                depth: self.options.max_include_depth,
            });
        }
        let statement = self.catalog.get(scope, ref_id)?;
        let nested = Position {
            label: statement.full_id(),
            scope: &statement.scope,
            parameter_map: statement.parameter_map.as_deref(),
            depth,
        };
        self.tags(&statement.tags, &nested)
    }
}

/// Strip a leading `word` (case-insensitive, whole word when alphanumeric)
fn strip_word_prefix<'b>(body: &'b str, word: &str) -> Option<&'b str> {
    if word.is_empty() {
        return None;
    }
    let head = body.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &body[word.len()..];
    let bounded = !word.ends_with(|c: char| c.is_alphanumeric())
        || rest.chars().next().is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
    bounded.then(|| rest.trim_start())
}

fn strip_word_suffix<'b>(body: &'b str, word: &str) -> Option<&'b str> {
    if word.is_empty() || word.len() > body.len() {
        return None;
    }
    let split = body.len() - word.len();
    let tail = body.get(split..)?;
    if !tail.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &body[..split];
    let bounded = !word.starts_with(|c: char| c.is_alphanumeric())
        || rest.chars().last().is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
    bounded.then(|| rest.trim_end())
}
