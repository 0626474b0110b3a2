// Test Server - fake booking site for scenario tests
//
// Serves a single page that mimics the parts of the booking site the
// scenarios touch: hero titles and search bar, the quote form with its
// details panel and legal dialogs, the one-way promo, and the pay-with-code
// route. The payment-code API always answers 404 so a passing scenario
// proves the request was intercepted.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Response, StatusCode},
    routing::get,
};
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Test server handle
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start the test server on a random available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/", get(index_page))
            .route("/api/codigos-pago/{code}", get(payment_code_api));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");

        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        TestServer { addr, handle }
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}/", self.addr)).expect("valid test server URL")
    }

    /// Shutdown the test server
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

async fn payment_code_api() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"success":false,"message":"Código no encontrado"}"#))
        .unwrap()
}

async fn index_page() -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(
            r##"<!DOCTYPE html>
<html lang="es">
<head><meta charset="utf-8"><title>Transportes Araucaria</title></head>
<body>
  <section id="inicio">
    <h1>Viajes privados y de turismo</h1>
    <p>Cotiza y reserva en línea de forma rápida y segura.</p>

    <div id="hero-bar">
      <p>Tu viaje comienza aquí</p>
      <select id="hero-origen">
        <option value="">Origen</option>
        <option value="temuco">Temuco</option>
      </select>
      <select id="hero-destino">
        <option value="">Destino</option>
        <option value="pucon">Pucón</option>
      </select>
      <input id="hero-fecha" type="date">
      <select>
        <option value="">Hora</option>
        <option>08:00</option>
        <option>09:00</option>
        <option>10:00</option>
        <option>11:00</option>
        <option>12:00</option>
      </select>
      <select id="hero-pasajeros">
        <option value="1">1</option>
        <option value="2">2</option>
      </select>
      <button type="button" id="buscar">Buscar</button>
      <div id="hero-sheet" style="display:none">
        <h3>Resumen</h3>
        <p>Resumen de la búsqueda</p>
        <input id="hero-nombre" placeholder="Nombre">
      </div>
    </div>

    <form id="reserva" onsubmit="return false">
      <h2>Viaja a cualquier lugar</h2>
      <select id="origen" name="origen">
        <option value="">Origen</option>
        <option value="Aeropuerto La Araucanía">Aeropuerto La Araucanía</option>
      </select>
      <select id="destino" name="destino">
        <option value="">Destino</option>
        <option value="Pucón">Pucón</option>
      </select>
      <input id="fecha" name="fecha" type="date">
      <select id="hora" name="hora">
        <option value="">Hora</option>
        <option value="09:00">09:00</option>
        <option value="10:00">10:00</option>
      </select>
      <select name="pasajeros">
        <option value="1">1</option>
        <option value="2">2</option>
      </select>
      <label><input type="checkbox" id="idaVuelta"> Necesito regreso</label>
      <div id="promo" style="display:none">Precio especial si reservas ida y vuelta</div>
      <button type="button" id="ver-precios">Ver precios</button>
      <button type="button" id="reservar">Reservar Ahora</button>
    </form>

    <div id="detalles" style="display:none">
      <h2>Detalles y Pago</h2>
      <input name="nombre" placeholder="Nombre">
      <input name="email" type="email" placeholder="Email">
      <input name="telefono" placeholder="Teléfono">
      <label>
        <input type="checkbox" id="terms">
        Acepto los <a href="#" id="ver-terminos">términos y condiciones</a>
        y la <a href="#" id="ver-privacidad">política de privacidad</a>
      </label>
      <button type="button">Pagar con Flow</button>
    </div>
  </section>

  <section id="pagar" style="display:none">
    <input id="codigo" placeholder="Código">
    <button id="validar">Validar Código</button>
    <div id="resultado"></div>
  </section>

  <script>
    const $ = (id) => document.getElementById(id);
    const show = (id) => { $(id).style.display = 'block'; };

    function updatePromo() {
      const visible = $('destino').value !== '' && !$('idaVuelta').checked;
      $('promo').style.display = visible ? 'block' : 'none';
    }
    $('origen').addEventListener('change', updatePromo);
    $('destino').addEventListener('change', updatePromo);
    $('idaVuelta').addEventListener('change', updatePromo);

    $('buscar').addEventListener('click', () => show('hero-sheet'));
    $('ver-precios').addEventListener('click', () => show('detalles'));
    $('reservar').addEventListener('click', () => show('detalles'));

    // Dialogs exist only while open
    function openDialog(title) {
      const dialog = document.createElement('div');
      dialog.setAttribute('role', 'dialog');
      dialog.innerHTML = '<h2>' + title + '</h2><p>Texto legal.</p>';
      document.body.appendChild(dialog);
    }
    $('ver-terminos').addEventListener('click', (e) => {
      e.preventDefault();
      openDialog('Condiciones de servicio');
    });
    $('ver-privacidad').addEventListener('click', (e) => {
      e.preventDefault();
      openDialog('Política de Privacidad');
    });
    document.addEventListener('keydown', (e) => {
      if (e.key === 'Escape') {
        document.querySelectorAll('[role=dialog]').forEach((d) => d.remove());
      }
    });

    function route() {
      const paying = location.hash === '#pagar-con-codigo';
      $('pagar').style.display = paying ? 'block' : 'none';
      $('inicio').style.display = paying ? 'none' : 'block';
    }
    window.addEventListener('hashchange', route);
    route();

    $('validar').addEventListener('click', async () => {
      const res = await fetch('/api/codigos-pago/' + encodeURIComponent($('codigo').value));
      const data = await res.json();
      if (data.success && data.codigoPago.sillaInfantil) {
        $('resultado').textContent = 'Silla de Niño incluida';
      } else {
        $('resultado').textContent = 'Código inválido';
      }
    });
  </script>
</body>
</html>"##,
        ))
        .unwrap()
}
