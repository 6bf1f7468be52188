//! Preview runtime shim
//!
//! A script injected into every composed preview document. It always installs
//! a window error hook that reports failures back to the host as a structured
//! message, and when the project has enabled plugins it also hosts them:
//! per-plugin style injection, lifecycle dispatch, a shared render tick, and
//! fault isolation so one broken plugin cannot take the page down.

use serde_json::json;

use crate::types::Plugin;

/// `type` field of the message posted to the host on a runtime error.
pub const PREVIEW_ERROR_MESSAGE_TYPE: &str = "preview-error";

/// Build the one-click fix prompt for a reported preview error.
pub fn fix_prompt(message: &str) -> String {
    format!(
        "I'm seeing this error in the preview: \"{}\". Please fix it.",
        message
    )
}

const SHIM_TEMPLATE: &str = r#"<script>
(function () {
  'use strict';

  window.addEventListener('error', function (event) {
    try {
      parent.postMessage({
        type: '__ERROR_TYPE__',
        message: event.message || String(event.error || 'Unknown error'),
        filename: event.filename || '',
        lineno: event.lineno || 0
      }, '*');
    } catch (e) { /* host gone, nothing to report to */ }
  });

  var plugins = __PLUGINS_JSON__;
  if (!plugins.length) { return; }

  var api = {
    dom: {
      query: function (sel) { return document.querySelector(sel); },
      queryAll: function (sel) { return Array.prototype.slice.call(document.querySelectorAll(sel)); },
      create: function (tag, props) { return Object.assign(document.createElement(tag), props || {}); }
    },
    events: {
      on: function (name, handler) {
        var wrapped = function (e) { handler(e.detail); };
        document.addEventListener('loom:' + name, wrapped);
        return function () { document.removeEventListener('loom:' + name, wrapped); };
      },
      emit: function (name, detail) {
        document.dispatchEvent(new CustomEvent('loom:' + name, { detail: detail }));
      }
    }
  };

  var registry = {};

  function showFault(name, message) {
    var box = document.createElement('div');
    box.className = 'loom-plugin-fault';
    box.style.cssText = 'position:fixed;bottom:20px;left:50%;transform:translateX(-50%);background:#1a1a1a;color:#ff5f56;padding:12px 16px;border:1px solid rgba(255,95,86,0.3);border-radius:12px;font-family:system-ui,sans-serif;font-size:12px;z-index:999999;display:flex;flex-direction:column;gap:4px;cursor:pointer;min-width:280px;max-width:90vw;';
    var title = document.createElement('div');
    title.style.fontWeight = '700';
    title.textContent = 'Plugin Error: ' + name;
    var detail = document.createElement('div');
    detail.style.cssText = 'opacity:0.8;font-family:monospace;font-size:10px;overflow:hidden;text-overflow:ellipsis;white-space:nowrap;';
    detail.textContent = message;
    box.appendChild(title);
    box.appendChild(detail);
    box.onclick = function () { box.remove(); };
    document.body.appendChild(box);
    setTimeout(function () { if (box.parentElement) { box.remove(); } }, 6000);
  }

  function fault(plugin, stage, err) {
    delete registry[plugin.id];
    var message = (err && err.message) ? err.message : String(err);
    showFault(plugin.metadata.name, message);
    try {
      parent.postMessage({
        type: '__ERROR_TYPE__',
        message: 'Plugin "' + plugin.metadata.name + '" failed during ' + stage + ': ' + message,
        filename: 'plugin:' + plugin.id,
        lineno: 0
      }, '*');
    } catch (e) { /* ignore */ }
  }

  function boot() {
    plugins.forEach(function (plugin) {
      if (plugin.code.style) {
        var style = document.createElement('style');
        style.id = 'loom-plugin-style-' + plugin.id;
        style.textContent = plugin.code.style;
        document.head.appendChild(style);
      }
      try {
        var factory = new Function('api', plugin.code.script + '\nreturn typeof plugin !== "undefined" ? plugin : null;');
        var instance = factory(api);
        if (instance) { registry[plugin.id] = instance; }
      } catch (err) {
        fault(plugin, 'load', err);
      }
    });

    plugins.forEach(function (plugin) {
      var instance = registry[plugin.id];
      if (instance && instance.hooks && typeof instance.hooks.onInit === 'function') {
        try { instance.hooks.onInit(api); } catch (err) { fault(plugin, 'init', err); }
      }
    });

    var last = performance.now();
    function tick(now) {
      var deltaTime = (now - last) / 1000;
      last = now;
      plugins.forEach(function (plugin) {
        var instance = registry[plugin.id];
        if (instance && instance.hooks && typeof instance.hooks.onRender === 'function') {
          try { instance.hooks.onRender(api, { now: now, deltaTime: deltaTime }); } catch (err) { fault(plugin, 'render', err); }
        }
      });
      requestAnimationFrame(tick);
    }
    requestAnimationFrame(tick);

    window.addEventListener('beforeunload', function () {
      plugins.forEach(function (plugin) {
        var instance = registry[plugin.id];
        if (instance && instance.hooks && typeof instance.hooks.onDestroy === 'function') {
          try { instance.hooks.onDestroy(api); } catch (e) { /* shutdown, ignore */ }
        }
      });
    });
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', boot);
  } else {
    boot();
  }
})();
</script>"#;

/// Render the runtime shim with the given enabled plugins embedded.
pub fn render_shim(plugins: &[&Plugin]) -> String {
    let embedded: Vec<serde_json::Value> = plugins
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "metadata": {
                    "name": p.metadata.name,
                    "description": p.metadata.description,
                },
                "code": {
                    "style": p.code.style,
                    "script": p.code.script,
                },
            })
        })
        .collect();

    let plugins_json = serde_json::to_string(&embedded)
        .unwrap_or_else(|_| "[]".to_string())
        // keep a literal </script> in plugin code from terminating the shim
        .replace("</", "<\\/");
    SHIM_TEMPLATE
        .replace("__ERROR_TYPE__", PREVIEW_ERROR_MESSAGE_TYPE)
        .replace("__PLUGINS_JSON__", &plugins_json)
}
